//! Storage (`/storage/v1`)

use crate::client::{RawResponse, SupabaseClient};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Bucket de armazenamento
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

impl Bucket {
    /// Interpreta o corpo de `GET /storage/v1/bucket`
    pub fn parse_list(raw: &RawResponse) -> Result<Vec<Bucket>> {
        Ok(serde_json::from_str(&raw.body)?)
    }
}

impl SupabaseClient {
    /// Lista os buckets visíveis para a chave em uso, sem tratamento de status
    pub async fn list_buckets_raw(&self) -> Result<RawResponse> {
        self.get_raw(&self.storage_url("bucket")).await
    }
}
