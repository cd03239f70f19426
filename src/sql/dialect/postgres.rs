//! PostgreSQL.

use super::SqlDialect;
use crate::sql::expr::CastType;

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    /// NUMERIC without precision keeps every digit of the compared value.
    fn cast_type(&self, ty: CastType) -> &'static str {
        match ty {
            CastType::Decimal => "NUMERIC",
            CastType::Text => "VARCHAR",
            CastType::Date => "DATE",
            CastType::Timestamp => "TIMESTAMP",
        }
    }

    fn function_alias(&self, name: &str) -> Option<&'static str> {
        match name {
            "IFNULL" | "ISNULL" | "NVL" => Some("COALESCE"),
            "LEN" => Some("LENGTH"),
            _ => None,
        }
    }
}
