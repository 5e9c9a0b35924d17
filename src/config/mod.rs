pub mod settings;

pub use settings::{HttpSettings, MigrationSettings, Settings, SupabaseSettings};
