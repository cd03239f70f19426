//! SQL Server and Azure SQL.
//!
//! There is no boolean predicate literal and no typed date literal. Paging
//! uses `OFFSET .. FETCH`, which is only legal after `ORDER BY`.

use super::{enclose, window_bound, SqlDialect};
use crate::sql::expr::CastType;
use crate::sql::token::{Keyword, TokenStream};

#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        enclose(ident, '[', ']')
    }

    /// Non-ASCII text needs the `N` prefix to survive the code page.
    fn string_literal(&self, s: &str) -> String {
        let prefix = if s.is_ascii() { "" } else { "N" };
        format!("{}'{}'", prefix, s.replace('\'', "''"))
    }

    fn bool_literal(&self, b: bool) -> &'static str {
        if b {
            "1"
        } else {
            "0"
        }
    }

    fn constant_predicate(&self, b: bool) -> &'static str {
        if b {
            "1 = 1"
        } else {
            "1 = 0"
        }
    }

    fn date_literal(&self, date: &str) -> String {
        format!("'{}'", date)
    }

    fn timestamp_literal(&self, ts: &str) -> String {
        format!("'{}'", ts)
    }

    fn cast_type(&self, ty: CastType) -> &'static str {
        match ty {
            CastType::Decimal => "DECIMAL(38, 10)",
            CastType::Text => "NVARCHAR(MAX)",
            CastType::Date => "DATE",
            CastType::Timestamp => "DATETIME2",
        }
    }

    fn function_alias(&self, name: &str) -> Option<&'static str> {
        match name {
            "LENGTH" => Some("LEN"),
            "IFNULL" | "NVL" => Some("ISNULL"),
            _ => None,
        }
    }

    // NULLS FIRST/LAST only exists from SQL Server 2022.
    fn supports_nulls_order(&self) -> bool {
        false
    }

    fn paging_requires_order_by(&self) -> bool {
        true
    }

    fn write_paging(&self, out: &mut TokenStream, limit: Option<u64>, offset: Option<u64>) {
        out.keyword(Keyword::Offset)
            .space()
            .push(window_bound(offset.unwrap_or(0)))
            .space()
            .keyword(Keyword::Rows);
        if let Some(limit) = limit {
            out.space()
                .keyword(Keyword::FetchNext)
                .space()
                .push(window_bound(limit))
                .space()
                .keyword(Keyword::RowsOnly);
        }
    }
}
