//! MySQL and MariaDB.
//!
//! Backslash is an escape character inside string literals, so it is doubled
//! along with the quote. Booleans are `TINYINT(1)`.

use super::{enclose, SqlDialect};
use crate::sql::expr::CastType;

#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        enclose(ident, '`', '`')
    }

    fn string_literal(&self, s: &str) -> String {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn bool_literal(&self, b: bool) -> &'static str {
        if b {
            "1"
        } else {
            "0"
        }
    }

    /// A bare `DECIMAL` target has zero scale here.
    fn cast_type(&self, ty: CastType) -> &'static str {
        match ty {
            CastType::Decimal => "DECIMAL(65, 30)",
            CastType::Text => "CHAR",
            CastType::Date => "DATE",
            CastType::Timestamp => "DATETIME",
        }
    }

    fn function_alias(&self, name: &str) -> Option<&'static str> {
        match name {
            "ISNULL" | "NVL" => Some("IFNULL"),
            "LEN" | "LENGTH" => Some("CHAR_LENGTH"),
            _ => None,
        }
    }

    fn supports_nulls_order(&self) -> bool {
        false
    }
}
