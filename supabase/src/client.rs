//! Cliente HTTP para a API do Supabase

use crate::error::{Result, SupabaseError};
use crate::status::StatusClass;
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Cliente para interagir com um projeto Supabase
///
/// Envia `apikey` e `Authorization: Bearer` em todas as requisições. O bearer
/// é a própria chave, a menos que um token de sessão tenha sido definido com
/// [`SupabaseClient::with_access_token`].
#[derive(Clone)]
pub struct SupabaseClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

/// Resposta sem tratamento de status, para quem precisa inspecionar o código
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn class(&self) -> StatusClass {
        StatusClass::from_status(self.status)
    }

    pub fn is_success(&self) -> bool {
        self.class().is_success()
    }

    /// Corpo como JSON; corpo vazio vira `Value::Null`
    pub fn json(&self) -> Result<Value> {
        parse_body(&self.body)
    }

    /// Mensagem de erro legível extraída do corpo
    pub fn error_message(&self) -> String {
        extract_error_message(&self.body)
    }
}

impl SupabaseClient {
    /// Cria um novo cliente
    ///
    /// # Argumentos
    ///
    /// * `base_url` - URL do projeto (ex: `https://xyz.supabase.co`)
    /// * `api_key` - anon key ou service role key
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(base_url, api_key, 30, 5)
    }

    /// Cria um novo cliente com timeouts customizados
    pub fn with_timeouts(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        total_timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        let api_key = api_key.into();

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SupabaseError::ConfigError(format!(
                "Invalid project URL '{}': expected http:// or https://",
                base_url
            )));
        }
        if api_key.trim().is_empty() {
            return Err(SupabaseError::ConfigError("API key is empty".to_string()));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(total_timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| SupabaseError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
            access_token: None,
        })
    }

    /// Usa o token de uma sessão autenticada como bearer
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// URL de um caminho do PostgREST (`/rest/v1/...`)
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// URL de um caminho do GoTrue (`/auth/v1/...`)
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// URL de um caminho do Storage (`/storage/v1/...`)
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);

        self.http_client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Content-Type", "application/json")
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SupabaseError::Timeout(url.to_string())
            } else {
                SupabaseError::HttpError(e)
            }
        })
    }

    /// GET com tratamento de erro
    pub(crate) async fn get(&self, url: &str) -> Result<Response> {
        tracing::debug!("GET {}", url);

        let response = self.send(self.request(Method::GET, url), url).await?;
        self.handle_response(response).await
    }

    /// GET sem tratamento de status
    pub(crate) async fn get_raw(&self, url: &str) -> Result<RawResponse> {
        tracing::debug!("GET {}", url);

        let response = self.send(self.request(Method::GET, url), url).await?;
        into_raw(response).await
    }

    /// DELETE sem tratamento de status
    pub(crate) async fn delete_raw_url(&self, url: &str) -> Result<RawResponse> {
        tracing::debug!("DELETE {}", url);

        let response = self.send(self.request(Method::DELETE, url), url).await?;
        into_raw(response).await
    }

    /// POST com tratamento de erro
    pub(crate) async fn post(&self, url: &str, body: &Value, prefer: Option<&str>) -> Result<Response> {
        let response = self.post_response(url, body, prefer).await?;
        self.handle_response(response).await
    }

    /// POST sem tratamento de status
    pub(crate) async fn post_raw(&self, url: &str, body: &Value, prefer: Option<&str>) -> Result<RawResponse> {
        let response = self.post_response(url, body, prefer).await?;
        into_raw(response).await
    }

    async fn post_response(&self, url: &str, body: &Value, prefer: Option<&str>) -> Result<Response> {
        tracing::debug!("POST {} ({} bytes)", url, body.to_string().len());

        let mut builder = self.request(Method::POST, url).json(body);
        if let Some(prefer) = prefer {
            builder = builder.header("Prefer", prefer);
        }

        self.send(builder, url).await
    }

    /// Processa a resposta HTTP e trata erros
    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let status_code = status.as_u16();
            let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!("Supabase API error ({}): {}", status_code, error_body);

            Err(SupabaseError::ApiError {
                status: status_code,
                message: extract_error_message(&error_body),
                code: extract_error_code(&error_body),
            })
        }
    }

    /// Lê o corpo de uma resposta já validada como JSON
    pub(crate) async fn read_json(response: Response) -> Result<Value> {
        let body = response.text().await?;
        parse_body(&body)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Indica se o cliente envia um token de sessão em vez da chave
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

async fn into_raw(response: Response) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(RawResponse { status, body })
}

fn parse_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

/// Extrai a mensagem de erro de um corpo JSON do PostgREST/GoTrue
pub(crate) fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let message = ["message", "error_description", "msg", "error", "hint"]
            .iter()
            .find_map(|key| json.get(*key).and_then(|v| v.as_str()));

        if let Some(message) = message {
            return message.to_string();
        }
    }
    body.to_string()
}

/// Campo `code` de um corpo de erro do PostgREST
pub(crate) fn extract_error_code(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    match json.get("code")? {
        Value::String(code) if !code.is_empty() => Some(code.clone()),
        _ => None,
    }
}
