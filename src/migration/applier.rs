use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use supabase::rpc::SqlEndpoint;
use supabase::{SupabaseClient, SupabaseError};

use super::loader::MigrationScript;
use super::report::{MigrationReport, StatementResult, StatementStatus};
use super::splitter::{split, split_statements, SplitMode, Statement, DEFAULT_SECTION_DELIMITER};
use crate::config::MigrationSettings;
use crate::utils::logging::*;

/// O que fazer quando um statement falha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Registra a falha e segue para o próximo statement
    #[default]
    ContinueOnError,
    /// Para no primeiro statement com falha
    FailFast,
}

impl ErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorPolicy::ContinueOnError => "continue-on-error",
            ErrorPolicy::FailFast => "fail-fast",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "continue-on-error" | "continue" => Ok(ErrorPolicy::ContinueOnError),
            "fail-fast" | "abort" => Ok(ErrorPolicy::FailFast),
            other => Err(format!(
                "Invalid error policy '{}' (expected continue-on-error or fail-fast)",
                other
            )),
        }
    }
}

/// Falha que torna o endpoint SQL inutilizável para o resto do lote:
/// credencial recusada (401/403) ou função auxiliar não instalada (404)
///
/// O PostgREST também responde 401/403/404 para erros do próprio SQL
/// (`42501`, `42P01`) quando a função não os captura. Esses vêm com um
/// SQLSTATE no campo `code` e contam como falha comum do statement.
pub fn is_fatal(error: &SupabaseError) -> bool {
    match error.status() {
        Some(401) | Some(403) | Some(404) => !error.code().map_or(false, is_sqlstate),
        _ => false,
    }
}

/// SQLSTATE: cinco caracteres alfanuméricos (`PGRSTxxx` não se encaixa)
fn is_sqlstate(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|byte| byte.is_ascii_alphanumeric())
}

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub policy: ErrorPolicy,
    pub split_mode: SplitMode,
    pub section_delimiter: String,
    /// Pausa entre statements (não depois do último)
    pub delay: Duration,
    pub dry_run: bool,
    /// Em `sections`/`whole`, reenvia statement por statement uma unidade que falhou
    pub fallback_to_statements: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            policy: ErrorPolicy::default(),
            split_mode: SplitMode::default(),
            section_delimiter: DEFAULT_SECTION_DELIMITER.to_string(),
            delay: Duration::from_millis(500),
            dry_run: false,
            fallback_to_statements: false,
        }
    }
}

impl ApplyOptions {
    pub fn from_settings(settings: &MigrationSettings) -> Self {
        Self {
            policy: settings.policy,
            split_mode: settings.split_mode,
            section_delimiter: settings.section_delimiter.clone(),
            delay: Duration::from_millis(settings.delay_ms),
            dry_run: false,
            fallback_to_statements: settings.fallback_to_statements,
        }
    }

    /// Unidades que seriam enviadas para o script
    pub fn plan(&self, script: &MigrationScript) -> Vec<Statement> {
        split(&script.sql, self.split_mode, &self.section_delimiter)
    }

    /// Relatório com todas as unidades `Skipped`, sem nenhuma requisição
    pub fn skipped_report(&self, script: &MigrationScript) -> MigrationReport {
        let mut report = MigrationReport::new(script.name.clone(), self.split_mode, self.policy, self.dry_run);
        report.results = self.plan(script).iter().map(StatementResult::skipped).collect();
        report
    }
}

/// Aplica scripts SQL via RPC, um statement por vez, sem rollback
///
/// Cada unidade é enviada ao [`SqlEndpoint`] e classificada; falhas seguem a
/// [`ErrorPolicy`], exceto as fatais (ver [`is_fatal`]), que sempre abortam.
/// Statements não enviados após um aborto ficam como `Skipped`.
pub struct MigrationApplier {
    client: SupabaseClient,
    endpoint: SqlEndpoint,
    options: ApplyOptions,
}

impl MigrationApplier {
    pub fn new(client: SupabaseClient, endpoint: SqlEndpoint, options: ApplyOptions) -> Self {
        Self {
            client,
            endpoint,
            options,
        }
    }

    pub async fn apply(&self, script: &MigrationScript) -> MigrationReport {
        let statements = self.options.plan(script);
        let total = statements.len();

        log_migration_started(&script.name, total, self.options.split_mode.as_str());

        if self.options.dry_run {
            return self.options.skipped_report(script);
        }

        let mut report = MigrationReport::new(
            script.name.clone(),
            self.options.split_mode,
            self.options.policy,
            false,
        );

        for (position, statement) in statements.iter().enumerate() {
            if report.aborted {
                report.results.push(StatementResult::skipped(statement));
                continue;
            }

            if position > 0 {
                self.pause().await;
            }

            log_statement_started(statement.index, total, &statement.preview(80));

            let started = Instant::now();
            let mut status = self.execute(statement).await;
            let mut fallback = Vec::new();

            if self.falls_back(&status) {
                let statements = split_statements(&statement.sql);
                if statements.len() > 1 {
                    log_warning(&format!(
                        "🔁 Unit {}/{} failed, retrying its {} statements one by one",
                        statement.index,
                        total,
                        statements.len()
                    ));
                    fallback = self.execute_each(statement, statements).await;
                    status = fallback_status(&fallback);
                }
            }
            let duration_ms = started.elapsed().as_millis() as u64;

            match &status {
                StatementStatus::Failed { status: code, message, fatal } => {
                    log_statement_failed(statement.index, total, *code, message);

                    if *fatal || self.options.policy == ErrorPolicy::FailFast {
                        log_batch_aborted(statement.index, total - position - 1);
                        report.aborted = true;
                    }
                }
                _ => log_statement_succeeded(statement.index, total, duration_ms),
            }

            report
                .results
                .push(StatementResult::new(statement, status, duration_ms).with_fallback(fallback));
        }

        report.finished_at = Utc::now();
        log_migration_finished(&script.name, report.succeeded(), report.failed(), report.skipped());

        report
    }

    /// Aplica vários scripts em ordem
    ///
    /// Depois de um lote abortado os scripts seguintes não são enviados e
    /// aparecem com todos os statements `Skipped`.
    pub async fn apply_all(&self, scripts: &[MigrationScript]) -> Vec<MigrationReport> {
        let mut reports: Vec<MigrationReport> = Vec::with_capacity(scripts.len());

        for script in scripts {
            if reports.last().map_or(false, |report| report.aborted) {
                log_warning(&format!("⏭️  Skipping {} after aborted batch", script.name));

                let mut report = self.options.skipped_report(script);
                report.aborted = true;
                reports.push(report);
                continue;
            }

            if !reports.is_empty() && !self.options.dry_run {
                self.pause().await;
            }

            reports.push(self.apply(script).await);
        }

        reports
    }

    async fn execute(&self, statement: &Statement) -> StatementStatus {
        match self.endpoint.execute(&self.client, &statement.sql).await {
            Ok(_) => StatementStatus::Succeeded,
            Err(err) => StatementStatus::Failed {
                status: err.status(),
                message: failure_message(&err),
                fatal: is_fatal(&err),
            },
        }
    }

    fn falls_back(&self, status: &StatementStatus) -> bool {
        self.options.fallback_to_statements
            && self.options.split_mode != SplitMode::Statements
            && matches!(status, StatementStatus::Failed { fatal: false, .. })
    }

    /// Envia os statements de uma unidade que falhou, um por vez
    ///
    /// Segue a mesma [`ErrorPolicy`]; linhas são relativas ao script.
    async fn execute_each(&self, unit: &Statement, statements: Vec<Statement>) -> Vec<StatementResult> {
        let offset = unit.line.saturating_sub(statements.first().map_or(1, |first| first.line));
        let total = statements.len();
        let mut results = Vec::with_capacity(total);
        let mut stopped = false;

        for mut statement in statements {
            statement.line += offset;

            if stopped {
                results.push(StatementResult::skipped(&statement));
                continue;
            }

            self.pause().await;
            log_statement_started(statement.index, total, &statement.preview(80));

            let started = Instant::now();
            let status = self.execute(&statement).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match &status {
                StatementStatus::Failed { status: code, message, fatal } => {
                    log_statement_failed(statement.index, total, *code, message);
                    stopped = *fatal || self.options.policy == ErrorPolicy::FailFast;
                }
                _ => log_statement_succeeded(statement.index, total, duration_ms),
            }

            results.push(StatementResult::new(&statement, status, duration_ms));
        }

        results
    }

    async fn pause(&self) {
        if !self.options.delay.is_zero() {
            tokio::time::sleep(self.options.delay).await;
        }
    }
}

/// Estado da unidade depois do reenvio: sucesso só se todos passaram
fn fallback_status(results: &[StatementResult]) -> StatementStatus {
    let failures: Vec<&StatementResult> = results.iter().filter(|result| result.status.is_failed()).collect();

    match failures.first().map(|first| (first.index, &first.status)) {
        Some((index, StatementStatus::Failed { status, message, .. })) => StatementStatus::Failed {
            status: *status,
            message: format!(
                "{} of {} statements failed one by one; #{}: {}",
                failures.len(),
                results.len(),
                index,
                message
            ),
            fatal: failures
                .iter()
                .any(|result| matches!(result.status, StatementStatus::Failed { fatal: true, .. })),
        },
        _ => StatementStatus::Succeeded,
    }
}

fn failure_message(error: &SupabaseError) -> String {
    match error {
        SupabaseError::SqlError { message, detail: Some(code) } => format!("{} (SQLSTATE {})", message, code),
        SupabaseError::SqlError { message, detail: None } => message.clone(),
        SupabaseError::ApiError { message, code: Some(code), .. } if is_sqlstate(code) => {
            format!("{} (SQLSTATE {})", message, code)
        }
        SupabaseError::ApiError { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SCRIPT: &str = "CREATE TABLE IF NOT EXISTS a (id int);\nCREATE TABLE IF NOT EXISTS b (id int);\nCREATE TABLE IF NOT EXISTS c (id int);\n";

    fn options(policy: ErrorPolicy) -> ApplyOptions {
        ApplyOptions {
            policy,
            delay: Duration::ZERO,
            ..ApplyOptions::default()
        }
    }

    fn applier(server: &MockServer, options: ApplyOptions) -> MigrationApplier {
        let client = SupabaseClient::new(server.base_url(), "service-key").unwrap();
        MigrationApplier::new(client, SqlEndpoint::default(), options)
    }

    fn statuses(report: &MigrationReport) -> Vec<StatementStatus> {
        report.results.iter().map(|r| r.status.clone()).collect()
    }

    #[tokio::test]
    async fn test_all_statements_succeed() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/exec_sql")
                    .header("apikey", "service-key");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let report = applier(&server, options(ErrorPolicy::ContinueOnError))
            .apply(&MigrationScript::from_sql("001.sql", SCRIPT))
            .await;

        mock.assert_hits_async(3).await;
        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 3);
        assert!(report.is_success());
        assert!(!report.aborted);
    }

    #[tokio::test]
    async fn test_rerunning_idempotent_migration_succeeds_again() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let applier = applier(&server, options(ErrorPolicy::ContinueOnError));
        let script = MigrationScript::from_sql("001.sql", SCRIPT);

        let first = applier.apply(&script).await;
        let second = applier.apply(&script).await;

        assert_eq!(first.summary(), second.summary());
        assert!(second.is_success());
    }

    #[tokio::test]
    async fn test_continue_on_error_reports_sql_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/exec_sql")
                    .json_body(json!({"query": "CREATE TABLE IF NOT EXISTS b (id int);"}));
                then.status(200).json_body(json!({
                    "success": false,
                    "error": "permission denied for schema public",
                    "detail": "42501"
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let report = applier(&server, options(ErrorPolicy::ContinueOnError))
            .apply(&MigrationScript::from_sql("001.sql", SCRIPT))
            .await;

        assert_eq!(
            statuses(&report),
            vec![
                StatementStatus::Succeeded,
                StatementStatus::Failed {
                    status: None,
                    message: "permission denied for schema public (SQLSTATE 42501)".to_string(),
                    fatal: false,
                },
                StatementStatus::Succeeded,
            ]
        );
        assert_eq!(report.attempted(), 3);
        assert!(!report.aborted);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/exec_sql")
                    .json_body(json!({"query": "CREATE TABLE IF NOT EXISTS a (id int);"}));
                then.status(400).json_body(json!({"message": "syntax error"}));
            })
            .await;
        let rest = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let report = applier(&server, options(ErrorPolicy::FailFast))
            .apply(&MigrationScript::from_sql("001.sql", SCRIPT))
            .await;

        rest.assert_hits_async(0).await;
        assert!(report.aborted);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.attempted(), 1);
        assert_eq!(
            report.results[0].status,
            StatementStatus::Failed {
                status: Some(400),
                message: "syntax error".to_string(),
                fatal: false,
            }
        );
    }

    #[tokio::test]
    async fn test_missing_function_aborts_even_when_continuing() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(404).json_body(json!({
                    "code": "PGRST202",
                    "message": "Could not find the function public.exec_sql(query) in the schema cache"
                }));
            })
            .await;

        let report = applier(&server, options(ErrorPolicy::ContinueOnError))
            .apply(&MigrationScript::from_sql("001.sql", SCRIPT))
            .await;

        mock.assert_hits_async(1).await;
        assert!(report.aborted);
        assert!(matches!(
            report.results[0].status,
            StatementStatus::Failed { status: Some(404), fatal: true, .. }
        ));
        assert_eq!(report.skipped(), 2);
    }

    #[tokio::test]
    async fn test_sql_error_behind_404_does_not_abort() {
        let server = MockServer::start_async().await;
        let missing = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/exec_sql")
                    .json_body(json!({"query": "CREATE TABLE IF NOT EXISTS a (id int);"}));
                then.status(404).json_body(json!({
                    "code": "42P01",
                    "message": "relation \"profiles\" does not exist"
                }));
            })
            .await;
        let rest = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let report = applier(&server, options(ErrorPolicy::ContinueOnError))
            .apply(&MigrationScript::from_sql("001.sql", SCRIPT))
            .await;

        missing.assert_hits_async(1).await;
        rest.assert_hits_async(2).await;
        assert!(!report.aborted);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(
            report.results[0].status,
            StatementStatus::Failed {
                status: Some(404),
                message: "relation \"profiles\" does not exist (SQLSTATE 42P01)".to_string(),
                fatal: false,
            }
        );
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let report = applier(
            &server,
            ApplyOptions {
                dry_run: true,
                ..options(ErrorPolicy::ContinueOnError)
            },
        )
        .apply(&MigrationScript::from_sql("001.sql", SCRIPT))
        .await;

        mock.assert_hits_async(0).await;
        assert!(report.dry_run);
        assert_eq!(report.skipped(), 3);
        assert_eq!(report.attempted(), 0);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_apply_all_stops_after_aborted_script() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(401).json_body(json!({"message": "Invalid API key"}));
            })
            .await;

        let scripts = vec![
            MigrationScript::from_sql("001.sql", SCRIPT),
            MigrationScript::from_sql("002.sql", "ALTER TABLE a ADD COLUMN x int;"),
        ];
        let reports = applier(&server, options(ErrorPolicy::ContinueOnError))
            .apply_all(&scripts)
            .await;

        mock.assert_hits_async(1).await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].failed(), 1);
        assert_eq!(reports[1].skipped(), 1);
        assert!(reports[1].aborted);
    }

    #[tokio::test]
    async fn test_sections_mode_sends_one_call_per_section() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let sql = format!(
            "{d}\n-- tabelas\n{d}\n{s}{d}\n-- índices\n{d}\nCREATE INDEX IF NOT EXISTS a_id ON a (id);\n",
            d = DEFAULT_SECTION_DELIMITER,
            s = SCRIPT
        );
        let report = applier(
            &server,
            ApplyOptions {
                split_mode: SplitMode::Sections,
                ..options(ErrorPolicy::ContinueOnError)
            },
        )
        .apply(&MigrationScript::from_sql("002.sql", sql))
        .await;

        mock.assert_hits_async(2).await;
        assert_eq!(report.total(), 2);
        assert_eq!(report.split_mode, SplitMode::Sections);
    }

    fn sectioned_script() -> MigrationScript {
        let sql = format!(
            "{d}\n-- tabelas\n{d}\n{s}{d}\n-- índices\n{d}\nCREATE INDEX IF NOT EXISTS a_id ON a (id);\n",
            d = DEFAULT_SECTION_DELIMITER,
            s = SCRIPT
        );
        MigrationScript::from_sql("002.sql", sql)
    }

    fn with_fallback(policy: ErrorPolicy) -> ApplyOptions {
        ApplyOptions {
            split_mode: SplitMode::Sections,
            fallback_to_statements: true,
            ..options(policy)
        }
    }

    /// A seção inteira falha; dos statements, só `b` falha sozinho
    async fn mock_failing_section(server: &MockServer) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
        let section = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/exec_sql")
                    .json_body(json!({"query": SCRIPT.trim()}));
                then.status(200).json_body(json!({
                    "success": false,
                    "error": "relation \"b\" already exists",
                    "detail": "42P07"
                }));
            })
            .await;
        let single = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/exec_sql")
                    .json_body(json!({"query": "CREATE TABLE IF NOT EXISTS b (id int);"}));
                then.status(200).json_body(json!({
                    "success": false,
                    "error": "permission denied for schema public",
                    "detail": "42501"
                }));
            })
            .await;
        (section, single)
    }

    #[tokio::test]
    async fn test_failed_section_falls_back_to_statements() {
        let server = MockServer::start_async().await;
        let (section, single) = mock_failing_section(&server).await;
        let rest = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let report = applier(&server, with_fallback(ErrorPolicy::ContinueOnError))
            .apply(&sectioned_script())
            .await;

        section.assert_hits_async(1).await;
        single.assert_hits_async(1).await;
        // a e c da primeira seção, mais a seção de índices
        rest.assert_hits_async(3).await;

        assert_eq!(report.total(), 2);
        assert!(!report.aborted);

        let first = &report.results[0];
        assert_eq!(first.fallback.len(), 3);
        assert_eq!(
            first.fallback.iter().map(|r| r.line).collect::<Vec<_>>(),
            vec![4, 5, 6]
        );
        assert_eq!(first.fallback[0].status, StatementStatus::Succeeded);
        assert!(first.fallback[1].status.is_failed());
        assert_eq!(first.fallback[2].status, StatementStatus::Succeeded);
        assert_eq!(
            first.status,
            StatementStatus::Failed {
                status: None,
                message: "1 of 3 statements failed one by one; #2: permission denied for schema public (SQLSTATE 42501)"
                    .to_string(),
                fatal: false,
            }
        );
        assert_eq!(report.results[1].status, StatementStatus::Succeeded);
        assert!(report.results[1].fallback.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_that_recovers_marks_section_succeeded() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/exec_sql")
                    .json_body(json!({"query": SCRIPT.trim()}));
                then.status(500).json_body(json!({"message": "statement timeout"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let report = applier(&server, with_fallback(ErrorPolicy::FailFast))
            .apply(&sectioned_script())
            .await;

        assert!(report.is_success());
        assert_eq!(report.results[0].status, StatementStatus::Succeeded);
        assert_eq!(report.results[0].fallback.len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_respects_fail_fast() {
        let server = MockServer::start_async().await;
        let (_section, single) = mock_failing_section(&server).await;
        let rest = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/rpc/exec_sql");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let report = applier(&server, with_fallback(ErrorPolicy::FailFast))
            .apply(&sectioned_script())
            .await;

        single.assert_hits_async(1).await;
        // só o statement `a`; `c` e a seção de índices não são enviados
        rest.assert_hits_async(1).await;
        assert!(report.aborted);
        assert_eq!(report.results[0].fallback[2].status, StatementStatus::Skipped);
        assert_eq!(report.results[1].status, StatementStatus::Skipped);
    }

    #[tokio::test]
    async fn test_no_fallback_unless_enabled() {
        let server = MockServer::start_async().await;
        let (section, single) = mock_failing_section(&server).await;

        let report = applier(
            &server,
            ApplyOptions {
                fallback_to_statements: false,
                ..with_fallback(ErrorPolicy::ContinueOnError)
            },
        )
        .apply(&sectioned_script())
        .await;

        section.assert_hits_async(1).await;
        single.assert_hits_async(0).await;
        assert!(report.results[0].fallback.is_empty());
        assert!(report.results[0].status.is_failed());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("continue-on-error".parse::<ErrorPolicy>(), Ok(ErrorPolicy::ContinueOnError));
        assert_eq!("fail_fast".parse::<ErrorPolicy>(), Ok(ErrorPolicy::FailFast));
        assert!("retry".parse::<ErrorPolicy>().is_err());
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::ContinueOnError);
    }

    #[test]
    fn test_fatal_statuses() {
        let api = |status, code: Option<&str>| SupabaseError::ApiError {
            status,
            message: String::new(),
            code: code.map(str::to_string),
        };
        assert!(is_fatal(&api(401, None)));
        assert!(is_fatal(&api(403, None)));
        assert!(is_fatal(&api(404, None)));
        assert!(is_fatal(&api(404, Some("PGRST202"))));
        assert!(is_fatal(&api(401, Some("PGRST301"))));
        assert!(!is_fatal(&api(404, Some("42P01"))));
        assert!(!is_fatal(&api(403, Some("42501"))));
        assert!(!is_fatal(&api(401, Some("42501"))));
        assert!(!is_fatal(&api(400, None)));
        assert!(!is_fatal(&api(500, None)));
        assert!(!is_fatal(&SupabaseError::SqlError { message: "x".into(), detail: None }));
    }
}
