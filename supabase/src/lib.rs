//! Cliente da API REST do Supabase
//!
//! Este crate cobre apenas a superfície que as ferramentas de operação do
//! VBSolution consomem:
//!
//! - **PostgREST**: `/rest/v1/<tabela>` (select/insert) e `/rest/v1/` (descrição OpenAPI)
//! - **RPC**: `/rest/v1/rpc/<função>`, incluindo a função auxiliar `exec_sql`
//! - **Auth**: `/auth/v1/token?grant_type=password` e `/auth/v1/health`
//! - **Storage**: `/storage/v1/bucket`
//!
//! Todas as chamadas são sequenciais; o chamador decide quando enviar a próxima.
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use supabase::{SupabaseClient, rpc::SqlEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> supabase::Result<()> {
//!     // Ler de variáveis de ambiente (NUNCA hardcode!)
//!     let url = std::env::var("SUPABASE_URL").expect("SUPABASE_URL não configurado");
//!     let key = std::env::var("SUPABASE_SERVICE_ROLE_KEY").expect("chave não configurada");
//!
//!     let client = SupabaseClient::new(url, key)?;
//!     let endpoint = SqlEndpoint::default();
//!     endpoint.execute(&client, "CREATE TABLE IF NOT EXISTS notes (id uuid);").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod rest;
pub mod rpc;
pub mod status;
pub mod storage;

// Re-exports principais
pub use client::{RawResponse, SupabaseClient};
pub use error::{Result, SupabaseError};
pub use status::StatusClass;
