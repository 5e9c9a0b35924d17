use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use supabase::rpc::{SqlEndpoint, DEFAULT_SQL_FUNCTION, DEFAULT_SQL_PARAM};
use supabase::SupabaseClient;

use crate::migration::{ErrorPolicy, SplitMode, DEFAULT_SECTION_DELIMITER};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub supabase: SupabaseSettings,
    pub http: HttpSettings,
    pub migration: MigrationSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
    #[serde(default)]
    pub service_role_key: Option<String>,
    pub sql_function: String,  // Função RPC que executa SQL
    pub sql_param: String,     // Nome do parâmetro que recebe o SQL
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MigrationSettings {
    pub policy: ErrorPolicy,
    pub split_mode: SplitMode,
    pub section_delimiter: String,
    pub delay_ms: u64,  // Pausa entre requisições
    /// Reenvia statement por statement uma seção que falhou
    pub fallback_to_statements: bool,
}

impl SupabaseSettings {
    /// Chave para operações administrativas: service role quando configurada
    pub fn admin_key(&self) -> &str {
        self.service_role_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .unwrap_or(&self.anon_key)
    }

    pub fn sql_endpoint(&self) -> SqlEndpoint {
        SqlEndpoint::new(&self.sql_function, &self.sql_param)
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load("config", &run_mode)
    }

    /// Carrega `<dir>/default` e `<dir>/<run_mode>` (opcionais) e depois o ambiente
    pub fn load(config_dir: impl AsRef<Path>, run_mode: &str) -> Result<Self, ConfigError> {
        let dir = config_dir.as_ref();

        let mut builder = Self::with_defaults(Config::builder())?
            // Arquivo de configuração base
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&dir.join(run_mode).to_string_lossy()).required(false));

        // Variáveis usadas pelos scripts e pelo frontend
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            builder = builder.set_override("supabase.url", url)?;
        }
        if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
            builder = builder.set_override("supabase.anon_key", key)?;
        }
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            builder = builder.set_override("supabase.service_role_key", key)?;
        }

        // VBSOLUTION__MIGRATION__DELAY_MS=1000 etc.
        builder = builder.add_source(Environment::with_prefix("VBSOLUTION").separator("__"));

        builder.build()?.try_deserialize()
    }

    fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_default("supabase.url", "")?
            .set_default("supabase.anon_key", "")?
            .set_default("supabase.sql_function", DEFAULT_SQL_FUNCTION)?
            .set_default("supabase.sql_param", DEFAULT_SQL_PARAM)?
            .set_default("http.timeout_secs", 30)?
            .set_default("http.connect_timeout_secs", 5)?
            .set_default("migration.policy", ErrorPolicy::default().as_str())?
            .set_default("migration.split_mode", SplitMode::default().as_str())?
            .set_default("migration.section_delimiter", DEFAULT_SECTION_DELIMITER)?
            .set_default("migration.delay_ms", 500)?
            .set_default("migration.fallback_to_statements", false)
    }

    pub fn validate(&self) -> AppResult<()> {
        let url = self.supabase.url.trim();
        if url.is_empty() {
            return Err(AppError::ConfigError(
                "Supabase URL not configured (SUPABASE_URL or --url)".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::ConfigError(format!("Invalid Supabase URL: {}", url)));
        }
        if self.supabase.anon_key.trim().is_empty() && self.supabase.service_role_key.is_none() {
            return Err(AppError::ConfigError(
                "No API key configured (SUPABASE_ANON_KEY, SUPABASE_SERVICE_ROLE_KEY or --key)".to_string(),
            ));
        }
        if self.supabase.sql_function.trim().is_empty() || self.supabase.sql_param.trim().is_empty() {
            return Err(AppError::ConfigError("SQL function and parameter must not be empty".to_string()));
        }
        Ok(())
    }

    /// Cliente com a chave administrativa (migrações, seed, inspeção)
    pub fn admin_client(&self) -> AppResult<SupabaseClient> {
        self.client_with_key(self.supabase.admin_key())
    }

    /// Cliente com a anon key, como um visitante não autenticado
    pub fn anon_client(&self) -> AppResult<SupabaseClient> {
        self.client_with_key(&self.supabase.anon_key)
    }

    fn client_with_key(&self, key: &str) -> AppResult<SupabaseClient> {
        self.validate()?;
        Ok(SupabaseClient::with_timeouts(
            &self.supabase.url,
            key,
            self.http.timeout_secs,
            self.http.connect_timeout_secs,
        )?)
    }
}
