//! Row grouping and aggregation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{QueryError, QueryResult, ValidationError};
use crate::filter::FieldTypes;
use crate::model::{ColumnVO, ServerSideGetRowsRequest};
use crate::sql::{self, col, count_star, Expr, ExprExt, SelectExpr};
use crate::sync;

/// Builds an aggregate expression around a column expression.
pub type AggregateFn = Arc<dyn Fn(Expr) -> Expr + Send + Sync>;

/// Aggregate functions by name.
///
/// Starts with `avg`, `sum`, `min`, `max` and `count`; more can be
/// registered. `min` and `max` are order-based so they also apply to text
/// and temporal columns.
#[derive(Clone)]
pub struct AggregateRegistry {
    functions: HashMap<String, AggregateFn>,
}

impl Default for AggregateRegistry {
    fn default() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register("avg", sql::avg);
        registry.register("sum", sql::sum);
        registry.register("min", sql::min);
        registry.register("max", sql::max);
        registry.register("count", sql::count);
        registry
    }
}

impl fmt::Debug for AggregateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("AggregateRegistry")
            .field("functions", &names)
            .finish()
    }
}

impl AggregateRegistry {
    /// Add or replace an aggregate.
    pub fn register(&mut self, name: &str, f: impl Fn(Expr) -> Expr + Send + Sync + 'static) {
        self.functions.insert(name.to_string(), Arc::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn apply(&self, name: &str, expr: Expr) -> QueryResult<Expr> {
        self.functions
            .get(name)
            .map(|f| f(expr))
            .ok_or_else(|| QueryError::unrecognized("aggregate function", name))
    }

    /// Aggregate expression for a value column.
    pub fn aggregate(&self, value_col: &ColumnVO) -> QueryResult<Expr> {
        let name = value_col.agg_func.as_deref().ok_or_else(|| {
            QueryError::invalid(
                format!("valueCols.{}.aggFunc", value_col.field),
                "is required for value columns",
            )
        })?;
        self.apply(name, col(&value_col.field))
    }
}

/// Select list and group-by produced for one request level.
#[derive(Debug, Clone, Default)]
pub struct GroupingPlan {
    pub select: Vec<SelectExpr>,
    pub group_by: Vec<Expr>,
}

/// Plan the select list and group-by.
///
/// While grouping, selects the active group columns, then the child count
/// when requested, then each value column aggregated and aliased by field.
/// At leaf level selects `projection`, or `*` when it is empty.
pub fn plan_grouping(
    request: &ServerSideGetRowsRequest,
    aggregates: &AggregateRegistry,
    projection: &[String],
    child_count_alias: Option<&str>,
) -> QueryResult<GroupingPlan> {
    if !request.is_grouping() {
        let select = if projection.is_empty() {
            vec![SelectExpr::new(sql::star())]
        } else {
            projection.iter().map(|f| SelectExpr::new(col(f))).collect()
        };
        return Ok(GroupingPlan {
            select,
            group_by: Vec::new(),
        });
    }

    let group_cols = request.active_group_cols();
    let mut select: Vec<SelectExpr> = group_cols
        .iter()
        .map(|c| SelectExpr::new(col(&c.field)))
        .collect();
    if let Some(alias) = child_count_alias {
        select.push(count_star().alias(alias));
    }
    if !request.is_pivoting() {
        for value_col in &request.value_cols {
            select.push(aggregates.aggregate(value_col)?.alias(&value_col.field));
        }
    }

    Ok(GroupingPlan {
        select,
        group_by: group_cols.iter().map(|c| col(&c.field)).collect(),
    })
}

/// One equality per expanded group level, with the key synchronized to the
/// column type. A `null` key selects the empty group.
pub fn group_key_predicates(
    request: &ServerSideGetRowsRequest,
    types: &dyn FieldTypes,
) -> QueryResult<Vec<Expr>> {
    let mut predicates = Vec::with_capacity(request.group_keys.len());
    let mut errors = Vec::new();

    for (i, (group_col, key)) in request
        .row_group_cols
        .iter()
        .zip(&request.group_keys)
        .enumerate()
    {
        let column = col(&group_col.field);
        let text = match key {
            serde_json::Value::Null => {
                predicates.push(column.is_null());
                continue;
            }
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match sync::synchronize_text(column, types.field_type(&group_col.field), &text) {
            Ok((expr, value)) => predicates.push(expr.eq(value.to_literal())),
            Err(e) => errors.push(
                ValidationError::new(format!("groupKeys[{}]", i), e.to_string())
                    .with_rejected(key.clone()),
            ),
        }
    }

    if errors.is_empty() {
        Ok(predicates)
    } else {
        Err(QueryError::InvalidRequest(errors))
    }
}
