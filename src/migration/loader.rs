use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::{AppError, AppResult};

/// Script SQL carregado em memória
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationScript {
    /// Nome exibido nos relatórios (nome do arquivo)
    pub name: String,
    pub path: Option<PathBuf>,
    pub sql: String,
}

impl MigrationScript {
    pub fn from_sql(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            sql: sql.into(),
        }
    }

    /// Lê um arquivo `.sql`
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AppError::FileNotFound(path.to_path_buf()));
        }

        let sql = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!("Loaded {} ({} bytes)", path.display(), sql.len());

        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            sql,
        })
    }

    /// Lê todos os `*.sql` de um diretório, em ordem de nome
    ///
    /// Migrações com prefixo de timestamp (`20250101120000_x.sql`) saem na
    /// ordem em que foram criadas.
    pub fn load_dir(dir: impl AsRef<Path>) -> AppResult<Vec<Self>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AppError::FileNotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map_or(false, |ext| ext.eq_ignore_ascii_case("sql"))
            })
            .collect();

        if paths.is_empty() {
            return Err(AppError::ValidationError(format!(
                "No .sql files found in {}",
                dir.display()
            )));
        }

        paths.sort();
        paths.into_iter().map(Self::load).collect()
    }

    /// Arquivo ou diretório
    pub fn load_path(path: impl AsRef<Path>) -> AppResult<Vec<Self>> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Ok(vec![Self::load(path)?])
        }
    }
}
