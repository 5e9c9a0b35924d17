use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use supabase::SupabaseClient;

use crate::migration::{is_fatal, ErrorPolicy};
use crate::utils::logging::{log_info, log_seed_row_failed};
use crate::utils::{AppError, AppResult};

/// Bloco de um arquivo de seed: uma tabela e suas linhas
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedTable {
    pub table: String,
    #[serde(default)]
    pub rows: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Many(Vec<SeedTable>),
    One(SeedTable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedFormat {
    Json,
    Yaml,
}

impl SeedFormat {
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(SeedFormat::Json),
            Some("yaml") | Some("yml") => Ok(SeedFormat::Yaml),
            _ => Err(AppError::ValidationError(format!(
                "Unsupported seed file {} (expected .json, .yaml or .yml)",
                path.display()
            ))),
        }
    }
}

/// Interpreta o conteúdo de um arquivo de seed
///
/// Aceita `{table, rows}` ou uma lista desses blocos. Cada linha precisa ser
/// um objeto JSON.
pub fn parse_seed(content: &str, format: SeedFormat) -> AppResult<Vec<SeedTable>> {
    let file: SeedFile = match format {
        SeedFormat::Json => serde_json::from_str(content)?,
        SeedFormat::Yaml => serde_yaml::from_str(content)?,
    };

    let tables = match file {
        SeedFile::Many(tables) => tables,
        SeedFile::One(table) => vec![table],
    };

    for table in &tables {
        if table.table.trim().is_empty() {
            return Err(AppError::ValidationError("Seed block without table name".to_string()));
        }
        if let Some(position) = table.rows.iter().position(|row| !row.is_object()) {
            return Err(AppError::ValidationError(format!(
                "Row {} of table '{}' is not an object",
                position + 1,
                table.table
            )));
        }
    }

    Ok(tables)
}

pub fn load_seed_file(path: impl AsRef<Path>) -> AppResult<Vec<SeedTable>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AppError::FileNotFound(path.to_path_buf()));
    }

    let format = SeedFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    parse_seed(&content, format)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableSeedResult {
    pub table: String,
    pub inserted: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub tables: Vec<TableSeedResult>,
    pub aborted: bool,
}

impl SeedReport {
    pub fn inserted(&self) -> usize {
        self.tables.iter().map(|table| table.inserted).sum()
    }

    pub fn failed(&self) -> usize {
        self.tables.iter().map(|table| table.failed).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && !self.aborted
    }
}

/// Insere dados de exemplo linha a linha
pub struct Seeder {
    client: SupabaseClient,
    policy: ErrorPolicy,
    delay: Duration,
}

impl Seeder {
    pub fn new(client: SupabaseClient, policy: ErrorPolicy, delay: Duration) -> Self {
        Self {
            client,
            policy,
            delay,
        }
    }

    pub async fn seed(&self, tables: &[SeedTable]) -> SeedReport {
        let mut report = SeedReport::default();
        let mut first_request = true;

        'tables: for seed in tables {
            log_info(&format!("🌱 Seeding {} ({} rows)", seed.table, seed.rows.len()));

            let mut result = TableSeedResult {
                table: seed.table.clone(),
                ..TableSeedResult::default()
            };

            for (position, row) in seed.rows.iter().enumerate() {
                if !first_request && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                first_request = false;

                match self.client.insert(&seed.table, row, false).await {
                    Ok(_) => result.inserted += 1,
                    Err(err) => {
                        log_seed_row_failed(&seed.table, position + 1, &err.to_string());
                        result.failed += 1;
                        result.errors.push(format!("row {}: {}", position + 1, err));

                        if is_fatal(&err) || self.policy == ErrorPolicy::FailFast {
                            report.aborted = true;
                            report.tables.push(result);
                            break 'tables;
                        }
                    }
                }
            }

            report.tables.push(result);
        }

        report
    }
}
