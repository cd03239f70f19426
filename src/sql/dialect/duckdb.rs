//! DuckDB.

use super::SqlDialect;

#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn function_alias(&self, name: &str) -> Option<&'static str> {
        match name {
            "IFNULL" | "ISNULL" | "NVL" => Some("COALESCE"),
            "LEN" => Some("LENGTH"),
            _ => None,
        }
    }
}
