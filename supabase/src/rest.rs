//! Acesso às tabelas via PostgREST (`/rest/v1/<tabela>`)

use crate::client::{RawResponse, SupabaseClient};
use crate::error::{Result, SupabaseError};
use serde_json::Value;

/// Consulta simples a uma tabela: colunas, filtros de igualdade e limite
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    table: String,
    select: String,
    filters: Vec<(String, String)>,
    limit: Option<usize>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    /// Filtro `coluna=eq.valor`
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Caminho relativo a `/rest/v1/`, com query string codificada
    pub fn to_path(&self) -> String {
        let mut params = vec![format!("select={}", urlencoding::encode(&self.select))];
        params.extend(self.filter_params());

        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }

        format!("{}?{}", urlencoding::encode(&self.table), params.join("&"))
    }

    /// Caminho só com os filtros, para DELETE
    pub fn to_filter_path(&self) -> String {
        format!("{}?{}", urlencoding::encode(&self.table), self.filter_params().join("&"))
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    fn filter_params(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|(column, value)| {
                format!("{}=eq.{}", urlencoding::encode(column), urlencoding::encode(value))
            })
            .collect()
    }
}

impl SupabaseClient {
    /// Executa a consulta sem converter status de erro
    pub async fn select_raw(&self, query: &TableQuery) -> Result<RawResponse> {
        self.get_raw(&self.rest_url(&query.to_path())).await
    }

    /// Insere uma linha (ou um array de linhas)
    ///
    /// Com `returning = true` envia `Prefer: return=representation` e devolve
    /// as linhas criadas; caso contrário `return=minimal` e devolve vazio.
    pub async fn insert(&self, table: &str, rows: &Value, returning: bool) -> Result<Vec<Value>> {
        let prefer = if returning { "return=representation" } else { "return=minimal" };

        let response = self
            .post(&self.rest_url(&urlencoding::encode(table)), rows, Some(prefer))
            .await?;
        let json = Self::read_json(response).await?;

        tracing::debug!("Inserted into {}: {}", table, json);

        Ok(rows_from(json))
    }

    /// Insere sem converter status de erro (usado em testes de RLS)
    pub async fn insert_raw(&self, table: &str, row: &Value, returning: bool) -> Result<RawResponse> {
        let prefer = if returning { "return=representation" } else { "return=minimal" };

        self.post_raw(&self.rest_url(&urlencoding::encode(table)), row, Some(prefer))
            .await
    }

    /// Remove as linhas que casam com os filtros, sem converter status de erro
    ///
    /// Recusa consultas sem filtro, que apagariam a tabela inteira.
    pub async fn delete_raw(&self, query: &TableQuery) -> Result<RawResponse> {
        if !query.has_filters() {
            return Err(SupabaseError::ConfigError(
                "Refusing to DELETE without a filter".to_string(),
            ));
        }

        self.delete_raw_url(&self.rest_url(&query.to_filter_path())).await
    }

    /// Documento OpenAPI publicado pelo PostgREST na raiz `/rest/v1/`
    pub async fn openapi(&self) -> Result<Value> {
        let response = self.get(&self.rest_url("")).await?;
        Self::read_json(response).await
    }

    /// GET na raiz `/rest/v1/` sem tratamento de status
    pub async fn rest_root_raw(&self) -> Result<RawResponse> {
        self.get_raw(&self.rest_url("")).await
    }
}

fn rows_from(json: Value) -> Vec<Value> {
    match json {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
