//! Autenticação via GoTrue (`/auth/v1`)

use crate::client::{RawResponse, SupabaseClient};
use crate::error::{Result, SupabaseError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Sessão retornada pelo login com email e senha
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
}

impl Session {
    /// ID do usuário autenticado, quando presente
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref()?.get("id")?.as_str()
    }
}

impl SupabaseClient {
    /// Login com email e senha (`grant_type=password`)
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.auth_url("token?grant_type=password");
        let body = json!({ "email": email, "password": password });

        tracing::info!("🔐 Signing in as {}", email);

        let response = self.post_raw(&url, &body, None).await?;
        if !response.is_success() {
            return Err(SupabaseError::AuthError(format!(
                "status {}: {}",
                response.status,
                response.error_message()
            )));
        }

        let session: Session = serde_json::from_str(&response.body)?;
        Ok(session)
    }

    /// Health check do serviço de autenticação
    pub async fn auth_health(&self) -> Result<RawResponse> {
        self.get_raw(&self.auth_url("health")).await
    }
}
