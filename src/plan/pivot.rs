//! Pivot column generation.
//!
//! Each combination of pivot values becomes one result column per value
//! column: the value aggregated over only the rows matching that
//! combination.

use crate::error::{QueryError, QueryResult};
use crate::model::{ServerSideGetRowsRequest, Value};
use crate::sql::{case_when, col, Expr, ExprExt, SelectExpr};

use super::grouping::AggregateRegistry;

/// Pivot state for one request. Built once, then read-only.
#[derive(Debug, Clone, Default)]
pub struct PivotingContext {
    /// Distinct values of each pivot column, in pivot column order.
    pub pivot_values: Vec<(String, Vec<Value>)>,
    /// `(column, value)` pairs of each pivot column.
    pub pairs: Vec<Vec<(String, Value)>>,
    /// Cartesian product of `pairs`.
    pub combinations: Vec<Vec<(String, Value)>>,
    /// Generated column names and their aggregate expressions.
    pub columns: Vec<(String, Expr)>,
    separator: String,
}

impl PivotingContext {
    /// Generate pivot columns from the distinct values of each pivot column.
    ///
    /// Fails with [`QueryError::PivotMaxColumnsExceeded`] before expanding
    /// when the number of combinations exceeds `max_columns`.
    pub fn build(
        request: &ServerSideGetRowsRequest,
        pivot_values: Vec<(String, Vec<Value>)>,
        aggregates: &AggregateRegistry,
        separator: &str,
        max_columns: Option<usize>,
    ) -> QueryResult<Self> {
        if let Some(limit) = max_columns {
            let actual = pivot_values
                .iter()
                .fold(1usize, |acc, (_, values)| acc.saturating_mul(values.len()));
            if actual > limit {
                return Err(QueryError::PivotMaxColumnsExceeded { limit, actual });
            }
        }

        let pairs: Vec<Vec<(String, Value)>> = pivot_values
            .iter()
            .map(|(field, values)| {
                values
                    .iter()
                    .map(|v| (field.clone(), v.clone()))
                    .collect()
            })
            .collect();

        let combinations = cartesian_product(&pairs);

        let mut columns = Vec::with_capacity(combinations.len() * request.value_cols.len());
        for combination in &combinations {
            let prefix = combination
                .iter()
                .map(|(_, v)| v.name_part())
                .collect::<Vec<_>>()
                .join(separator);
            for value_col in &request.value_cols {
                let name = format!("{}{}{}", prefix, separator, value_col.field);
                let filtered = combination
                    .iter()
                    .rev()
                    .fold(col(&value_col.field), |inner, (field, value)| {
                        case_when(pivot_match(field, value), inner)
                    });
                let agg_name = value_col.agg_func.as_deref().ok_or_else(|| {
                    QueryError::invalid(
                        format!("valueCols.{}.aggFunc", value_col.field),
                        "is required for value columns",
                    )
                })?;
                columns.push((name, aggregates.apply(agg_name, filtered)?));
            }
        }

        Ok(Self {
            pivot_values,
            pairs,
            combinations,
            columns,
            separator: separator.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Generated column names, in select order.
    pub fn result_fields(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn expression(&self, name: &str) -> Option<&Expr> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, expr)| expr)
    }

    pub fn is_pivot_name(&self, name: &str) -> bool {
        self.expression(name).is_some()
    }

    pub fn select_exprs(&self) -> Vec<SelectExpr> {
        self.columns
            .iter()
            .map(|(name, expr)| expr.clone().alias(name))
            .collect()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}

/// The value column a generated pivot name was built from: everything after
/// the last separator.
pub fn original_col_name<'a>(pivot_name: &'a str, separator: &str) -> &'a str {
    match pivot_name.rfind(separator) {
        Some(i) => &pivot_name[i + separator.len()..],
        None => pivot_name,
    }
}

/// Every combination taking one pair from each list, earlier lists varying
/// slowest. An empty list yields no combinations.
pub fn cartesian_product<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    lists.iter().fold(vec![Vec::new()], |acc, list| {
        acc.iter()
            .flat_map(|prefix| {
                list.iter().map(move |item| {
                    let mut next = prefix.clone();
                    next.push(item.clone());
                    next
                })
            })
            .collect()
    })
}

fn pivot_match(field: &str, value: &Value) -> Expr {
    match value {
        Value::Null => col(field).is_null(),
        other => col(field).eq(other.to_literal()),
    }
}
