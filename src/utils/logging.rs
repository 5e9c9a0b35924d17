use tracing::{debug, error, info, warn};

pub fn log_config_loaded(env: &str, url: &str) {
    info!("Configuration loaded for environment: {} - Project: {}", env, url);
}

pub fn log_migration_started(script: &str, units: usize, mode: &str) {
    info!("🚀 Applying migration {} ({} units, split mode: {})", script, units, mode);
}

pub fn log_statement_started(index: usize, total: usize, preview: &str) {
    debug!("🔧 Executing statement {}/{}: {}", index, total, preview);
}

pub fn log_statement_succeeded(index: usize, total: usize, duration_ms: u64) {
    info!("✅ Statement {}/{} executed ({}ms)", index, total, duration_ms);
}

pub fn log_statement_failed(index: usize, total: usize, status: Option<u16>, message: &str) {
    warn!("⚠️  Statement {}/{} failed - Status: {:?} - Error: {}", index, total, status, message);
}

pub fn log_batch_aborted(index: usize, remaining: usize) {
    error!("⛔ Batch aborted at statement {} - {} statement(s) not attempted", index, remaining);
}

pub fn log_migration_finished(script: &str, succeeded: usize, failed: usize, skipped: usize) {
    info!(
        "📊 Migration {} finished - Succeeded: {} - Failed: {} - Skipped: {}",
        script, succeeded, failed, skipped
    );
}

pub fn log_probe_result(table: &str, probe: &str, status: Option<u16>, passed: bool) {
    if passed {
        info!("🔒 {} [{}] passed - Status: {:?}", table, probe, status);
    } else {
        warn!("🔓 {} [{}] FAILED - Status: {:?}", table, probe, status);
    }
}

pub fn log_seed_row_failed(table: &str, row: usize, error: &str) {
    warn!("⚠️  Seed {} row {} failed: {}", table, row, error);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
