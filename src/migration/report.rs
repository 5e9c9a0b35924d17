use chrono::{DateTime, Utc};
use serde::Serialize;

use super::applier::ErrorPolicy;
use super::splitter::{SplitMode, Statement};

/// Resultado de um statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatementStatus {
    Succeeded,
    Failed {
        status: Option<u16>,
        message: String,
        /// O endpoint SQL está inutilizável (credencial ou função ausente)
        fatal: bool,
    },
    /// Não enviado: dry run ou lote abortado antes dele
    Skipped,
}

impl StatementStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StatementStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementResult {
    pub index: usize,
    pub line: usize,
    pub sql: String,
    #[serde(flatten)]
    pub status: StatementStatus,
    pub duration_ms: u64,
    /// Statements reenviados um a um depois que a seção falhou
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback: Vec<StatementResult>,
}

impl StatementResult {
    pub fn new(statement: &Statement, status: StatementStatus, duration_ms: u64) -> Self {
        Self {
            index: statement.index,
            line: statement.line,
            sql: statement.sql.clone(),
            status,
            duration_ms,
            fallback: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Vec<StatementResult>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn skipped(statement: &Statement) -> Self {
        Self::new(statement, StatementStatus::Skipped, 0)
    }
}

/// Relatório da aplicação de um script
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub script: String,
    pub split_mode: SplitMode,
    pub policy: ErrorPolicy,
    pub dry_run: bool,
    pub aborted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<StatementResult>,
}

/// Contagens agregadas de um [`MigrationReport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl MigrationReport {
    pub fn new(script: impl Into<String>, split_mode: SplitMode, policy: ErrorPolicy, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            script: script.into(),
            split_mode,
            policy,
            dry_run,
            aborted: false,
            started_at: now,
            finished_at: now,
            results: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|status| matches!(status, StatementStatus::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(StatementStatus::is_failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, StatementStatus::Skipped))
    }

    /// Statements efetivamente enviados (sucesso + falha)
    pub fn attempted(&self) -> usize {
        self.total() - self.skipped()
    }

    /// Nada falhou e nada deixou de ser enviado por aborto
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && !self.aborted
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total: self.total(),
            attempted: self.attempted(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            skipped: self.skipped(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &StatementResult> {
        self.results.iter().filter(|result| result.status.is_failed())
    }

    fn count(&self, predicate: impl Fn(&StatementStatus) -> bool) -> usize {
        self.results.iter().filter(|result| predicate(&result.status)).count()
    }
}
