use std::fmt;
use std::path::PathBuf;
use supabase::SupabaseError;

#[derive(Debug)]
pub enum AppError {
    Supabase(SupabaseError),
    ConfigError(String),
    FileNotFound(PathBuf),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Supabase(err) => write!(f, "Supabase error: {}", err),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::FileNotFound(path) => write!(f, "File not found: {}", path.display()),
            AppError::IoError(err) => write!(f, "IO error: {}", err),
            AppError::JsonError(err) => write!(f, "JSON error: {}", err),
            AppError::YamlError(err) => write!(f, "YAML error: {}", err),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Supabase(err) => Some(err),
            AppError::IoError(err) => Some(err),
            AppError::JsonError(err) => Some(err),
            AppError::YamlError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SupabaseError> for AppError {
    fn from(err: SupabaseError) -> Self {
        AppError::Supabase(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::YamlError(err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
