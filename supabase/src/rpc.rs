//! Chamadas RPC (`/rest/v1/rpc/<função>`) e execução de SQL

use crate::client::SupabaseClient;
use crate::error::{Result, SupabaseError};
use serde_json::{json, Map, Value};

/// Nome padrão da função auxiliar de execução SQL
pub const DEFAULT_SQL_FUNCTION: &str = "exec_sql";

/// Nome padrão do parâmetro que recebe o SQL
pub const DEFAULT_SQL_PARAM: &str = "query";

impl SupabaseClient {
    /// Chama uma função exposta via RPC; corpo vazio (função `void`) vira `Null`
    pub async fn rpc(&self, function: &str, args: &Value) -> Result<Value> {
        let url = self.rest_url(&format!("rpc/{}", urlencoding::encode(function)));
        let response = self.post(&url, args, None).await?;
        Self::read_json(response).await
    }
}

/// Endpoint remoto que executa SQL arbitrário
///
/// Corresponde a uma função `exec_sql(query text) returns json` instalada no
/// banco. A função captura exceções e responde `{"success": false, "error": ...}`
/// com status 200, então o corpo também precisa ser inspecionado.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlEndpoint {
    pub function: String,
    pub param: String,
}

impl Default for SqlEndpoint {
    fn default() -> Self {
        Self {
            function: DEFAULT_SQL_FUNCTION.to_string(),
            param: DEFAULT_SQL_PARAM.to_string(),
        }
    }
}

impl SqlEndpoint {
    pub fn new(function: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            param: param.into(),
        }
    }

    /// Corpo da requisição: `{ "<param>": "<sql>" }`
    pub fn payload(&self, sql: &str) -> Value {
        let mut body = Map::new();
        body.insert(self.param.clone(), json!(sql));
        Value::Object(body)
    }

    /// Executa um trecho de SQL e devolve o corpo da resposta
    pub async fn execute(&self, client: &SupabaseClient, sql: &str) -> Result<Value> {
        let result = client.rpc(&self.function, &self.payload(sql)).await?;
        check_sql_result(result)
    }
}

/// Converte `{"success": false, ...}` em [`SupabaseError::SqlError`]
pub fn check_sql_result(result: Value) -> Result<Value> {
    if result.get("success").and_then(Value::as_bool) == Some(false) {
        let message = result
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown SQL error")
            .to_string();
        let detail = result
            .get("detail")
            .and_then(Value::as_str)
            .map(str::to_string);

        return Err(SupabaseError::SqlError { message, detail });
    }
    Ok(result)
}
