//! Engine-specific rendering rules.
//!
//! A compiled grid query is dialect-neutral until it is serialized. Every
//! point where engines disagree goes through [`SqlDialect`]:
//!
//! | concern            | ANSI default            | overridden by        |
//! |--------------------|-------------------------|----------------------|
//! | identifiers        | `"name"`                | MySQL, T-SQL         |
//! | predicate constant | `TRUE` / `FALSE`        | T-SQL (`1 = 1`)      |
//! | paging             | `LIMIT n OFFSET m`      | T-SQL (`OFFSET/FETCH`) |
//! | `NULLS FIRST/LAST` | supported               | MySQL, T-SQL         |
//! | typed literals     | `DATE '..'`             | T-SQL                |

mod duckdb;
mod mysql;
mod postgres;
mod tsql;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use tsql::TSql;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::expr::CastType;
use super::token::{Keyword, Token, TokenStream};

/// How one engine spells the constructs a grid query uses.
///
/// Defaults follow ANSI SQL; each engine overrides only where it differs.
pub trait SqlDialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Quote a table, column or alias name.
    fn quote_ident(&self, ident: &str) -> String {
        enclose(ident, '"', '"')
    }

    /// Single-quoted string literal with embedded quotes doubled.
    fn string_literal(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    /// Boolean used as a value, e.g. the right side of `active = ?`.
    fn bool_literal(&self, b: bool) -> &'static str {
        if b {
            "true"
        } else {
            "false"
        }
    }

    /// Boolean used as a whole predicate: an empty AND, OR or IN list.
    fn constant_predicate(&self, b: bool) -> &'static str {
        if b {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn date_literal(&self, date: &str) -> String {
        format!("DATE '{}'", date)
    }

    fn timestamp_literal(&self, ts: &str) -> String {
        format!("TIMESTAMP '{}'", ts)
    }

    /// Target type name for `CAST(.. AS ?)`.
    fn cast_type(&self, ty: CastType) -> &'static str {
        match ty {
            CastType::Decimal => "DECIMAL(38, 10)",
            CastType::Text => "VARCHAR",
            CastType::Date => "DATE",
            CastType::Timestamp => "TIMESTAMP",
        }
    }

    /// Native spelling of a function, given its upper-cased portable name.
    fn function_alias(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    fn supports_nulls_order(&self) -> bool {
        true
    }

    /// Whether a paged query must carry an ORDER BY.
    fn paging_requires_order_by(&self) -> bool {
        false
    }

    /// Append the row window.
    fn write_paging(&self, out: &mut TokenStream, limit: Option<u64>, offset: Option<u64>) {
        let mut first = true;
        for (keyword, value) in [(Keyword::Limit, limit), (Keyword::Offset, offset)] {
            if let Some(value) = value {
                if !first {
                    out.space();
                }
                out.keyword(keyword).space().push(window_bound(value));
                first = false;
            }
        }
    }
}

pub(super) fn enclose(ident: &str, open: char, close: char) -> String {
    let escaped = ident.replace(close, &format!("{}{}", close, close));
    format!("{}{}{}", open, escaped, close)
}

/// The SQL engines a query plan can be rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    DuckDb,
    TSql,
    MySql,
    Postgres,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [Dialect::DuckDb, Dialect::TSql, Dialect::MySql, Dialect::Postgres];

    /// Rendering rules for this engine.
    pub fn rules(self) -> &'static dyn SqlDialect {
        match self {
            Dialect::DuckDb => &DuckDb,
            Dialect::TSql => &TSql,
            Dialect::MySql => &MySql,
            Dialect::Postgres => &Postgres,
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let alias = match wanted.as_str() {
            "postgresql" | "pg" => "postgres",
            "mssql" | "sqlserver" => "tsql",
            other => other,
        };
        Dialect::ALL
            .into_iter()
            .find(|d| d.rules().name() == alias)
            .ok_or_else(|| format!("unknown SQL dialect: {}", s))
    }
}

/// Row counts past `i64::MAX` clamp to it; no engine pages that far.
pub(crate) fn window_bound(value: u64) -> Token {
    Token::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rules().name())
    }
}
