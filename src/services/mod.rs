pub mod health;
pub mod rls_probe;
pub mod schema_inspector;
pub mod seeder;

pub use health::{check, EndpointHealth, HealthReport};
pub use rls_probe::{ProbeKind, ProbeOptions, ProbeReport, ProbeResult, RlsProbe};
pub use schema_inspector::{ColumnInfo, SchemaInspector, TableSchema, TableVerification};
pub use seeder::{load_seed_file, parse_seed, SeedReport, SeedTable, Seeder, TableSeedResult};
