//! Dialect-aware SQL for compiled grid requests.
//!
//! A request is compiled into a [`Query`] built from [`Expr`] trees. The
//! [`render`] pass lowers both into a [`TokenStream`], and only serialization
//! consults a [`Dialect`]. Identifier quoting, boolean and date literals, cast
//! targets and paging syntax all differ per engine; nothing else does.

pub mod dialect;
pub mod expr;
pub mod query;
pub mod render;
pub mod token;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    avg, case_when, cast, col, concat, conjunction, count, count_distinct, count_star,
    disjunction, exists, falsehood, func, lit_bool, lit_date, lit_decimal, lit_float, lit_int, lit_null,
    lit_str, lit_timestamp, lower, max, min, star, sum, table_col, trim, truth, BinaryOperator,
    CastType, Expr, ExprExt, Literal, UnaryOperator,
};
pub use query::{LimitOffset, NullsOrder, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use render::ToTokens;
pub use token::{Keyword, Token, TokenStream};
