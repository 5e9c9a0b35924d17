//! Tipos de erro para o crate supabase

use thiserror::Error;

/// Erros do cliente Supabase
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// Erro de requisição HTTP (conexão, DNS, corpo inválido)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Resposta não-2xx da API
    ///
    /// `code` é o campo `code` do corpo: `PGRSTxxx` para erros do próprio
    /// PostgREST, SQLSTATE (`42P01`, `42501`...) para erros do banco.
    #[error("Supabase API error (status {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// A função de execução SQL respondeu 2xx mas reportou falha no corpo
    #[error("SQL execution failed: {message}")]
    SqlError {
        message: String,
        detail: Option<String>,
    },

    /// Erro de autenticação
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout de operação
    #[error("Operation timeout: {0}")]
    Timeout(String),
}

impl SupabaseError {
    /// Status HTTP associado ao erro, quando houver
    pub fn status(&self) -> Option<u16> {
        match self {
            SupabaseError::ApiError { status, .. } => Some(*status),
            SupabaseError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Código de erro do PostgREST ou SQLSTATE, quando houver
    pub fn code(&self) -> Option<&str> {
        match self {
            SupabaseError::ApiError { code, .. } => code.as_deref(),
            SupabaseError::SqlError { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, SupabaseError>;
