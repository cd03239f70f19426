//! SELECT statement model and its fluent builder.

use std::fmt;

use super::dialect::Dialect;
use super::expr::{star, Expr, ExprExt};
use super::render::ToTokens;

/// One item of the select list.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(self, alias: &str) -> Self {
        Self {
            alias: Some(alias.to_string()),
            ..self
        }
    }

    /// Key under which this item appears in a result row.
    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match self.expr.column_name() {
            Some(column) => column.to_string(),
            None => self.expr.to_sql(Dialect::DuckDb),
        }
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

/// Source table, optionally schema-qualified and aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.to_string(),
            alias: None,
        }
    }

    /// Split `schema.table` on the last dot; a bare name has no schema.
    pub fn parse(name: &str) -> Self {
        name.rsplit_once('.')
            .map(|(schema, table)| Self::new(table).with_schema(schema))
            .unwrap_or_else(|| Self::new(name))
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Name columns of this source are qualified with.
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderByExpr {
    pub expr: Expr,
    pub dir: Option<SortDir>,
    /// Dropped when rendering for engines without `NULLS FIRST/LAST`.
    pub nulls: Option<NullsOrder>,
}

impl OrderByExpr {
    fn directed(expr: Expr, dir: SortDir) -> Self {
        Self {
            expr,
            dir: Some(dir),
            nulls: None,
        }
    }

    pub fn asc(expr: Expr) -> Self {
        Self::directed(expr, SortDir::Asc)
    }

    pub fn desc(expr: Expr) -> Self {
        Self::directed(expr, SortDir::Desc)
    }

    pub fn nulls_first(self) -> Self {
        Self {
            nulls: Some(NullsOrder::First),
            ..self
        }
    }

    pub fn nulls_last(self) -> Self {
        Self {
            nulls: Some(NullsOrder::Last),
            ..self
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

/// Row window. Either bound may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// A single SELECT statement over one table.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "a query does nothing until rendered with to_sql() or executed"]
pub struct Query {
    pub select: Vec<SelectExpr>,
    pub distinct: bool,
    pub from: Option<TableRef>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit_offset: Option<LimitOffset>,
}

fn and_into(slot: &mut Option<Expr>, predicate: Expr) {
    *slot = Some(match slot.take() {
        Some(existing) => existing.and(predicate),
        None => predicate,
    });
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the select list.
    pub fn select(mut self, items: Vec<impl Into<SelectExpr>>) -> Self {
        self.select = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn select_star(self) -> Self {
        self.select(vec![star()])
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(table);
        self
    }

    /// AND a predicate into WHERE.
    pub fn filter(mut self, predicate: Expr) -> Self {
        and_into(&mut self.where_clause, predicate);
        self
    }

    pub fn group_by(mut self, keys: Vec<Expr>) -> Self {
        self.group_by = keys;
        self
    }

    /// AND a predicate into HAVING.
    pub fn having(mut self, predicate: Expr) -> Self {
        and_into(&mut self.having, predicate);
        self
    }

    pub fn order_by(mut self, keys: Vec<OrderByExpr>) -> Self {
        self.order_by = keys;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_offset.get_or_insert_with(LimitOffset::default).limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.limit_offset.get_or_insert_with(LimitOffset::default).offset = Some(offset);
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

/// Renders for DuckDB.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql(Dialect::default()))
    }
}
