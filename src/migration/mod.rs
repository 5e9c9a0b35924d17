//! Aplicação de migrações SQL via RPC
//!
//! Fluxo: [`MigrationScript`] → [`split`] → [`MigrationApplier`] → [`MigrationReport`].

pub mod applier;
pub mod loader;
pub mod report;
pub mod splitter;

pub use applier::{is_fatal, ApplyOptions, ErrorPolicy, MigrationApplier};
pub use loader::MigrationScript;
pub use report::{MigrationReport, ReportSummary, StatementResult, StatementStatus};
pub use splitter::{split, SplitMode, Statement, DEFAULT_SECTION_DELIMITER};

use supabase::rpc::SqlEndpoint;

/// SQL da função auxiliar `exec_sql`, executado uma vez no SQL Editor
const EXEC_SQL_HELPER: &str = include_str!("../../migrations/0000_exec_sql_helper.sql");

/// SQL da função auxiliar adaptado ao nome de função e parâmetro configurados
pub fn bootstrap_sql(endpoint: &SqlEndpoint) -> String {
    EXEC_SQL_HELPER
        .replace("exec_sql", &endpoint.function)
        .replace("(query text)", &format!("({} text)", endpoint.param))
        .replace("\"query\"", &format!("\"{}\"", endpoint.param))
        .replace("EXECUTE query;", &format!("EXECUTE {};", endpoint.param))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_sql_default() {
        let sql = bootstrap_sql(&SqlEndpoint::default());

        assert!(sql.contains("CREATE OR REPLACE FUNCTION public.exec_sql(query text)"));
        assert!(sql.contains("SECURITY DEFINER"));
        assert!(sql.contains("'detail', SQLSTATE"));
        assert_eq!(split_statements_count(&sql), 4);
    }

    #[test]
    fn test_bootstrap_sql_custom_names() {
        let sql = bootstrap_sql(&SqlEndpoint::new("run_sql", "sql"));

        assert!(sql.contains("FUNCTION public.run_sql(sql text)"));
        assert!(sql.contains("EXECUTE sql;"));
        assert!(sql.contains("{\"sql\": \"<sql>\"}"));
        assert!(!sql.contains("exec_sql"));
    }

    fn split_statements_count(sql: &str) -> usize {
        split(sql, SplitMode::Statements, DEFAULT_SECTION_DELIMITER).len()
    }
}
