use serde::Serialize;
use serde_json::Value;
use supabase::rest::TableQuery;
use supabase::{RawResponse, StatusClass, SupabaseClient};

use crate::utils::logging::{log_probe_result, log_warning};
use crate::utils::{truncate_with_suffix, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    AnonymousRead,
    FilteredRead,
    AnonymousInsert,
    AuthenticatedRead,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::AnonymousRead => "anonymous read",
            ProbeKind::FilteredRead => "filtered read",
            ProbeKind::AnonymousInsert => "anonymous insert",
            ProbeKind::AuthenticatedRead => "authenticated read",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub table: String,
    pub probe: ProbeKind,
    pub status: Option<u16>,
    pub class: Option<StatusClass>,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub results: Vec<ProbeResult>,
    pub passed: usize,
    pub failed: usize,
}

impl ProbeReport {
    fn from_results(results: Vec<ProbeResult>) -> Self {
        let passed = results.iter().filter(|result| result.passed).count();
        let failed = results.len() - passed;
        Self {
            results,
            passed,
            failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Testes opcionais além da leitura anônima
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// Linha enviada no teste de inserção anônima
    pub sample_row: Option<Value>,
    /// Filtro `coluna=eq.valor` para a leitura filtrada
    pub filter: Option<(String, String)>,
}

/// Smoke tests de row-level security
///
/// As leituras e inserções usam a anon key, como um visitante sem sessão.
/// Com [`RlsProbe::with_session`] também verifica que um usuário logado
/// consegue ler.
pub struct RlsProbe {
    anon: SupabaseClient,
    authenticated: Option<SupabaseClient>,
}

impl RlsProbe {
    pub fn new(anon: SupabaseClient) -> Self {
        Self {
            anon,
            authenticated: None,
        }
    }

    /// Usa o token de acesso de um usuário para o teste autenticado
    pub fn with_session(mut self, access_token: impl Into<String>) -> Self {
        self.authenticated = Some(self.anon.clone().with_access_token(access_token));
        self
    }

    /// Faz login com email e senha e guarda a sessão
    pub async fn sign_in(self, email: &str, password: &str) -> AppResult<Self> {
        let session = self.anon.sign_in_with_password(email, password).await?;
        Ok(self.with_session(session.access_token))
    }

    /// Passa se o acesso é recusado (400/401/403/422) ou nenhuma linha é visível
    pub async fn probe_read(&self, table: &str) -> ProbeResult {
        let query = TableQuery::new(table).limit(1);
        let outcome = self.anon.select_raw(&query).await;
        self.record(table, ProbeKind::AnonymousRead, outcome, evaluate_read)
    }

    pub async fn probe_filtered_read(&self, table: &str, column: &str, value: &str) -> ProbeResult {
        let query = TableQuery::new(table).eq(column, value).limit(1);
        let outcome = self.anon.select_raw(&query).await;
        self.record(table, ProbeKind::FilteredRead, outcome, evaluate_read)
    }

    /// Passa só quando a inserção é recusada de forma controlada
    ///
    /// Se a linha for gravada, tenta apagá-la pelo `id` devolvido e registra
    /// no `detail` se conseguiu.
    pub async fn probe_insert(&self, table: &str, row: &Value) -> ProbeResult {
        let outcome = self.anon.insert_raw(table, row, true).await;
        let written = match &outcome {
            Ok(raw) if raw.is_success() => Some(raw.json().unwrap_or(Value::Null)),
            _ => None,
        };

        let mut result = self.record(table, ProbeKind::AnonymousInsert, outcome, evaluate_insert);
        if let Some(body) = written {
            let cleanup = self.remove_written_row(table, &body).await;
            result.detail = format!("{}; {}", result.detail, cleanup);
        }
        result
    }

    async fn remove_written_row(&self, table: &str, body: &Value) -> String {
        let Some(id) = returned_id(body) else {
            log_warning(&format!("⚠️ Test row left in {}: no id returned", table));
            return "test row left in place (no id returned)".to_string();
        };

        match self.anon.delete_raw(&TableQuery::new(table).eq("id", id.as_str())).await {
            Ok(raw) if raw.is_success() => format!("test row {} removed", id),
            Ok(raw) => {
                log_warning(&format!("⚠️ Could not remove test row {} from {}: {}", id, table, raw.status));
                format!("could not remove test row {} (status {})", id, raw.status)
            }
            Err(err) => {
                log_warning(&format!("⚠️ Could not remove test row {} from {}: {}", id, table, err));
                format!("could not remove test row {} ({})", id, err)
            }
        }
    }

    pub async fn probe_authenticated_read(&self, table: &str) -> ProbeResult {
        let Some(client) = &self.authenticated else {
            return ProbeResult {
                table: table.to_string(),
                probe: ProbeKind::AuthenticatedRead,
                status: None,
                class: None,
                passed: false,
                detail: "no authenticated session".to_string(),
            };
        };

        let outcome = client.select_raw(&TableQuery::new(table).limit(1)).await;
        self.record(table, ProbeKind::AuthenticatedRead, outcome, evaluate_authenticated_read)
    }

    /// Roda os testes aplicáveis em cada tabela, em sequência
    pub async fn run(&self, tables: &[String], options: &ProbeOptions) -> ProbeReport {
        let mut results = Vec::new();

        for table in tables {
            results.push(self.probe_read(table).await);

            if let Some((column, value)) = &options.filter {
                results.push(self.probe_filtered_read(table, column, value).await);
            }
            if let Some(row) = &options.sample_row {
                results.push(self.probe_insert(table, row).await);
            }
            if self.authenticated.is_some() {
                results.push(self.probe_authenticated_read(table).await);
            }
        }

        ProbeReport::from_results(results)
    }

    fn record(
        &self,
        table: &str,
        probe: ProbeKind,
        outcome: supabase::Result<RawResponse>,
        evaluate: fn(&RawResponse) -> (bool, String),
    ) -> ProbeResult {
        let result = match outcome {
            Ok(raw) => {
                let (passed, detail) = evaluate(&raw);
                ProbeResult {
                    table: table.to_string(),
                    probe,
                    status: Some(raw.status),
                    class: Some(raw.class()),
                    passed,
                    detail,
                }
            }
            Err(err) => ProbeResult {
                table: table.to_string(),
                probe,
                status: err.status(),
                class: None,
                passed: false,
                detail: err.to_string(),
            },
        };

        log_probe_result(table, probe.as_str(), result.status, result.passed);
        result
    }
}

fn evaluate_read(raw: &RawResponse) -> (bool, String) {
    match raw.class() {
        StatusClass::ExpectedFailure => (true, format!("access denied: {}", short(&raw.error_message()))),
        StatusClass::Success => match raw.json() {
            Ok(Value::Array(rows)) if rows.is_empty() => (true, "no rows visible".to_string()),
            Ok(Value::Array(rows)) => (
                false,
                format!("{} row(s) visible without authentication", rows.len()),
            ),
            _ => (false, "unexpected response body".to_string()),
        },
        StatusClass::Unexpected => (false, unexpected(raw)),
    }
}

fn evaluate_insert(raw: &RawResponse) -> (bool, String) {
    match raw.class() {
        StatusClass::ExpectedFailure => (true, format!("insert rejected: {}", short(&raw.error_message()))),
        StatusClass::Success => (false, "row written without authentication".to_string()),
        StatusClass::Unexpected => (false, unexpected(raw)),
    }
}

fn evaluate_authenticated_read(raw: &RawResponse) -> (bool, String) {
    match raw.class() {
        StatusClass::Success => {
            let rows = match raw.json() {
                Ok(Value::Array(rows)) => rows.len(),
                _ => 0,
            };
            (true, format!("{} row(s) visible", rows))
        }
        _ => (false, unexpected(raw)),
    }
}

/// `id` da primeira linha devolvida por `return=representation`
fn returned_id(body: &Value) -> Option<String> {
    let row = match body {
        Value::Array(rows) => rows.first()?,
        other => other,
    };

    match row.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn unexpected(raw: &RawResponse) -> String {
    format!("unexpected status {}: {}", raw.status, short(&raw.error_message()))
}

fn short(message: &str) -> String {
    truncate_with_suffix(message, 120, "...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn probe(server: &MockServer) -> RlsProbe {
        RlsProbe::new(SupabaseClient::new(server.base_url(), "anon").unwrap())
    }

    #[tokio::test]
    async fn test_read_denied_passes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/activities");
                then.status(401).json_body(json!({"message": "permission denied for table activities"}));
            })
            .await;

        let result = probe(&server).probe_read("activities").await;

        assert!(result.passed);
        assert_eq!(result.status, Some(401));
        assert_eq!(result.class, Some(StatusClass::ExpectedFailure));
    }

    #[tokio::test]
    async fn test_read_with_zero_rows_passes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/activities").query_param("limit", "1");
                then.status(200).json_body(json!([]));
            })
            .await;

        let result = probe(&server).probe_read("activities").await;

        assert!(result.passed);
        assert_eq!(result.detail, "no rows visible");
    }

    #[tokio::test]
    async fn test_visible_rows_fail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/companies");
                then.status(200).json_body(json!([{"id": "c1"}]));
            })
            .await;

        let result = probe(&server).probe_read("companies").await;

        assert!(!result.passed);
        assert_eq!(result.detail, "1 row(s) visible without authentication");
    }

    #[tokio::test]
    async fn test_unexpected_status_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/deals");
                then.status(404).json_body(json!({"message": "relation \"public.deals\" does not exist"}));
            })
            .await;

        let result = probe(&server).probe_read("deals").await;

        assert!(!result.passed);
        assert_eq!(result.class, Some(StatusClass::Unexpected));
    }

    #[tokio::test]
    async fn test_filtered_read_sends_filter() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/activities")
                    .query_param("owner_id", "eq.00000000-0000-0000-0000-000000000000");
                then.status(200).json_body(json!([]));
            })
            .await;

        let result = probe(&server)
            .probe_filtered_read("activities", "owner_id", "00000000-0000-0000-0000-000000000000")
            .await;

        mock.assert_async().await;
        assert!(result.passed);
        assert_eq!(result.probe, ProbeKind::FilteredRead);
    }

    #[tokio::test]
    async fn test_insert_outcomes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/activities");
                then.status(403).json_body(json!({
                    "code": "42501",
                    "message": "new row violates row-level security policy for table \"activities\""
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/notes");
                then.status(201);
            })
            .await;

        let probe = probe(&server);
        let blocked = probe.probe_insert("activities", &json!({"title": "rls"})).await;
        let written = probe.probe_insert("notes", &json!({"body": "rls"})).await;

        assert!(blocked.passed);
        assert!(!written.passed);
        assert_eq!(
            written.detail,
            "row written without authentication; test row left in place (no id returned)"
        );
    }

    #[tokio::test]
    async fn test_written_row_is_removed() {
        let server = MockServer::start_async().await;
        let insert = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/activities")
                    .header("Prefer", "return=representation");
                then.status(201).json_body(json!([{"id": 7, "title": "rls"}]));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/rest/v1/activities")
                    .query_param("id", "eq.7");
                then.status(204);
            })
            .await;

        let result = probe(&server).probe_insert("activities", &json!({"title": "rls"})).await;

        insert.assert_async().await;
        delete.assert_async().await;
        assert!(!result.passed);
        assert_eq!(result.status, Some(201));
        assert_eq!(result.detail, "row written without authentication; test row 7 removed");
    }

    #[tokio::test]
    async fn test_failed_cleanup_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/notes");
                then.status(201).json_body(json!([{"id": "n-1"}]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/rest/v1/notes");
                then.status(401).json_body(json!({"message": "permission denied"}));
            })
            .await;

        let result = probe(&server).probe_insert("notes", &json!({"body": "rls"})).await;

        assert!(!result.passed);
        assert_eq!(
            result.detail,
            "row written without authentication; could not remove test row n-1 (status 401)"
        );
    }

    #[tokio::test]
    async fn test_authenticated_read_requires_session() {
        let server = MockServer::start_async().await;
        let result = probe(&server).probe_authenticated_read("activities").await;

        assert!(!result.passed);
        assert_eq!(result.detail, "no authenticated session");
    }

    #[tokio::test]
    async fn test_run_with_session() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/token").query_param("grant_type", "password");
                then.status(200).json_body(json!({"access_token": "user-jwt", "token_type": "bearer"}));
            })
            .await;
        let authenticated = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/activities")
                    .header("Authorization", "Bearer user-jwt");
                then.status(200).json_body(json!([{"id": "a1"}]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/activities").header("Authorization", "Bearer anon");
                then.status(200).json_body(json!([]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/activities");
                then.status(401).json_body(json!({"message": "JWT required"}));
            })
            .await;

        let probe = probe(&server).sign_in("qa@vbsolution.dev", "secret").await.unwrap();
        let options = ProbeOptions {
            sample_row: Some(json!({"title": "rls probe"})),
            filter: None,
        };
        let report = probe.run(&["activities".to_string()], &options).await;

        authenticated.assert_async().await;
        let kinds: Vec<ProbeKind> = report.results.iter().map(|r| r.probe).collect();
        assert_eq!(
            kinds,
            vec![
                ProbeKind::AnonymousRead,
                ProbeKind::AnonymousInsert,
                ProbeKind::AuthenticatedRead
            ]
        );
        assert_eq!(report.passed, 3);
        assert_eq!(report.failed, 0);
        assert!(report.is_success());
    }
}
