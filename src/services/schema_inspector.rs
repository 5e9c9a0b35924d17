use serde::Serialize;
use serde_json::Value;
use supabase::SupabaseClient;

use crate::utils::{AppError, AppResult};

/// Coluna de uma tabela exposta pelo PostgREST
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Tipo JSON Schema (`string`, `integer`, ...)
    pub data_type: String,
    /// Tipo Postgres (`uuid`, `timestamp with time zone`, ...)
    pub format: Option<String>,
    pub required: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableVerification {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

impl TableVerification {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Inspeciona o schema publicado no documento OpenAPI de `/rest/v1/`
///
/// O documento só lista o que a chave em uso enxerga; com a anon key tabelas
/// sem grant podem não aparecer.
#[derive(Clone)]
pub struct SchemaInspector {
    client: SupabaseClient,
}

impl SchemaInspector {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list_tables(&self) -> AppResult<Vec<String>> {
        let doc = self.client.openapi().await?;
        Ok(parse_tables(&doc))
    }

    pub async fn describe_table(&self, table: &str) -> AppResult<TableSchema> {
        let doc = self.client.openapi().await?;
        parse_table(&doc, table).ok_or_else(|| {
            AppError::ValidationError(format!("Table '{}' not found in the REST schema", table))
        })
    }

    pub async fn verify_tables(&self, expected: &[String]) -> AppResult<TableVerification> {
        let tables = self.list_tables().await?;

        let (found, missing): (Vec<String>, Vec<String>) = expected
            .iter()
            .cloned()
            .partition(|name| tables.iter().any(|table| table == name));

        if !missing.is_empty() {
            tracing::warn!("⚠️  Missing tables: {}", missing.join(", "));
        }

        Ok(TableVerification { found, missing })
    }
}

/// Nomes das tabelas/views em `definitions`, ordenados
pub fn parse_tables(doc: &Value) -> Vec<String> {
    let mut tables: Vec<String> = doc
        .get("definitions")
        .and_then(Value::as_object)
        .map(|definitions| definitions.keys().cloned().collect())
        .unwrap_or_default();
    tables.sort();
    tables
}

pub fn parse_table(doc: &Value, table: &str) -> Option<TableSchema> {
    let definition = doc.get("definitions")?.get(table)?;

    let required: Vec<&str> = definition
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let columns = definition
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, property)| ColumnInfo {
                    name: name.clone(),
                    data_type: property
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    format: property.get("format").and_then(Value::as_str).map(str::to_string),
                    required: required.contains(&name.as_str()),
                    // PostgREST marca a PK na descrição
                    primary_key: property
                        .get("description")
                        .and_then(Value::as_str)
                        .map_or(false, |description| description.contains("<pk/>")),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(TableSchema {
        name: table.to_string(),
        columns,
    })
}
