//! In-memory data source.
//!
//! Holds one table of typed rows and executes compiled [`Query`] trees
//! against it directly. Used by the CLI and by the integration tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::eval::{contains_aggregate, Evaluator, Row, Scope};
use super::{DataSource, DataSourceError, ResultSet};
use crate::model::{ScalarType, Value};
use crate::sql::{Expr, NullsOrder, OrderByExpr, Query, SortDir, TableRef};
use crate::sync;

/// On-disk layout of a data file.
///
/// ```json
/// {
///   "table": "sales",
///   "columns": [{"name": "country", "type": "text"}, {"name": "amount", "type": "integer"}],
///   "rows": [{"country": "US", "amount": 10}]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DataFile {
    pub table: String,
    pub columns: Vec<DataColumn>,
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: ScalarType,
}

#[derive(Debug, Clone)]
pub struct MemoryDataSource {
    table: String,
    columns: Vec<(String, ScalarType)>,
    types: HashMap<String, ScalarType>,
    rows: Vec<Row>,
}

impl MemoryDataSource {
    pub fn new(table: &str, columns: &[(&str, ScalarType)]) -> Self {
        let columns: Vec<(String, ScalarType)> = columns
            .iter()
            .map(|(name, ty)| (name.to_string(), *ty))
            .collect();
        let types = columns.iter().cloned().collect();
        Self {
            table: table.to_string(),
            columns,
            types,
            rows: Vec::new(),
        }
    }

    /// Append a row given in column order.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<(), DataSourceError> {
        if values.len() != self.columns.len() {
            return Err(DataSourceError::InvalidData(format!(
                "expected {} values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        let row = self
            .columns
            .iter()
            .map(|(name, _)| name.clone())
            .zip(values)
            .collect();
        self.rows.push(row);
        Ok(())
    }

    pub fn with_rows(mut self, rows: Vec<Vec<Value>>) -> Result<Self, DataSourceError> {
        for row in rows {
            self.push_row(row)?;
        }
        Ok(self)
    }

    pub fn from_data_file(file: DataFile) -> Result<Self, DataSourceError> {
        let columns: Vec<(&str, ScalarType)> = file
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.ty))
            .collect();
        let mut source = Self::new(&file.table, &columns);

        for (index, record) in file.rows.iter().enumerate() {
            let mut row = Row::with_capacity(source.columns.len());
            for (name, ty) in &source.columns {
                let raw = record.get(name).unwrap_or(&serde_json::Value::Null);
                let value = typed_value(raw, *ty).map_err(|e| {
                    DataSourceError::InvalidData(format!("row {} column {}: {}", index, name, e))
                })?;
                row.insert(name.clone(), value);
            }
            source.rows.push(row);
        }
        Ok(source)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DataSourceError> {
        let file: DataFile = serde_json::from_str(json)?;
        Self::from_data_file(file)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DataSourceError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&content)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[(String, ScalarType)] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn run_query(&self, query: &Query) -> Result<ResultSet, DataSourceError> {
        if let Some(from) = &query.from {
            if !from.table.eq_ignore_ascii_case(&self.table) {
                return Err(DataSourceError::UnknownTable(from.table.clone()));
            }
        }

        let eval = Evaluator::new(&self.types);
        let where_clause = query
            .where_clause
            .as_ref()
            .map(|w| self.resolve_subqueries(w))
            .transpose()?;
        let having = query
            .having
            .as_ref()
            .map(|h| self.resolve_subqueries(h))
            .transpose()?;

        let correlated = where_clause.as_ref().is_some_and(has_exists);

        let mut matched: Vec<&Row> = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let keep = match &where_clause {
                Some(w) if correlated => eval.test(&self.bind_exists(w, row)?, Scope::Row(row))?,
                Some(w) => eval.test(w, Scope::Row(row))?,
                None => true,
            };
            if keep {
                matched.push(row);
            }
        }

        let aggregated = !query.group_by.is_empty()
            || having.is_some()
            || query.select.iter().any(|s| contains_aggregate(&s.expr));

        let columns = self.output_columns(query);
        // (output values, sort keys)
        let mut output: Vec<(Vec<Value>, Vec<Value>)> = Vec::new();

        if aggregated {
            for group in self.group(&eval, &query.group_by, matched)? {
                let scope = Scope::Group(&group);
                if let Some(h) = &having {
                    if !eval.test(h, scope)? {
                        continue;
                    }
                }
                output.push(self.project(&eval, query, scope)?);
            }
        } else {
            for row in matched {
                output.push(self.project(&eval, query, Scope::Row(row))?);
            }
        }

        if query.distinct {
            let mut unique: Vec<(Vec<Value>, Vec<Value>)> = Vec::with_capacity(output.len());
            for entry in output {
                if !unique.iter().any(|(seen, _)| same_values(seen, &entry.0)) {
                    unique.push(entry);
                }
            }
            output = unique;
        }

        if !query.order_by.is_empty() {
            output.sort_by(|a, b| compare_keys(&a.1, &b.1, &query.order_by));
        }

        let (offset, limit) = match &query.limit_offset {
            Some(lo) => (lo.offset.unwrap_or(0) as usize, lo.limit.map(|l| l as usize)),
            None => (0, None),
        };
        let rows = output
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(values, _)| values)
            .collect();

        Ok(ResultSet { columns, rows })
    }

    fn group<'r>(
        &self,
        eval: &Evaluator<'_>,
        group_by: &[Expr],
        rows: Vec<&'r Row>,
    ) -> Result<Vec<Vec<&'r Row>>, DataSourceError> {
        if group_by.is_empty() {
            return Ok(vec![rows]);
        }
        let mut groups: Vec<(Vec<Value>, Vec<&'r Row>)> = Vec::new();
        for row in rows {
            let key = group_by
                .iter()
                .map(|e| eval.eval(e, Scope::Row(row)))
                .collect::<Result<Vec<_>, _>>()?;
            match groups.iter_mut().find(|(k, _)| same_values(k, &key)) {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }
        Ok(groups.into_iter().map(|(_, members)| members).collect())
    }

    fn output_columns(&self, query: &Query) -> Vec<String> {
        let mut names = Vec::with_capacity(query.select.len());
        for item in &query.select {
            match &item.expr {
                Expr::Star { .. } => names.extend(self.columns.iter().map(|(n, _)| n.clone())),
                _ => names.push(item.output_name()),
            }
        }
        names
    }

    fn project(
        &self,
        eval: &Evaluator<'_>,
        query: &Query,
        scope: Scope<'_>,
    ) -> Result<(Vec<Value>, Vec<Value>), DataSourceError> {
        let mut values = Vec::with_capacity(query.select.len());
        for item in &query.select {
            match &item.expr {
                Expr::Star { .. } => {
                    for (name, _) in &self.columns {
                        values.push(eval.eval(&crate::sql::col(name), scope)?);
                    }
                }
                expr => values.push(eval.eval(expr, scope)?),
            }
        }
        let keys = query
            .order_by
            .iter()
            .map(|o| eval.eval(&o.expr, scope))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((values, keys))
    }

    /// Replace `IN (SELECT ...)` with the literal list the subquery yields.
    fn resolve_subqueries(&self, expr: &Expr) -> Result<Expr, DataSourceError> {
        let resolve = |e: &Expr| self.resolve_subqueries(e).map(Box::new);
        Ok(match expr {
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let result = self.run_query(subquery)?;
                let values = result
                    .rows
                    .iter()
                    .filter_map(|row| row.first())
                    .map(Value::to_literal)
                    .collect();
                Expr::In {
                    expr: resolve(expr)?,
                    values,
                    negated: *negated,
                }
            }
            Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
                left: resolve(left)?,
                op: *op,
                right: resolve(right)?,
            },
            Expr::UnaryOp { op, expr } => Expr::UnaryOp {
                op: *op,
                expr: resolve(expr)?,
            },
            Expr::Paren(inner) => Expr::Paren(resolve(inner)?),
            other => other.clone(),
        })
    }

    /// Decide every `EXISTS` for one outer row.
    fn bind_exists(&self, expr: &Expr, row: &Row) -> Result<Expr, DataSourceError> {
        let bind = |e: &Expr| self.bind_exists(e, row).map(Box::new);
        Ok(match expr {
            Expr::Exists { subquery, negated } => {
                let inner = subquery
                    .from
                    .as_ref()
                    .map_or(self.table.as_str(), TableRef::reference_name);
                let mut bound = (**subquery).clone();
                bound.where_clause = subquery
                    .where_clause
                    .as_ref()
                    .map(|w| substitute_outer(w, inner, row));
                bound.having = subquery
                    .having
                    .as_ref()
                    .map(|h| substitute_outer(h, inner, row));
                let found = !self.run_query(&bound)?.rows.is_empty();
                Expr::Truth(found != *negated)
            }
            Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
                left: bind(left)?,
                op: *op,
                right: bind(right)?,
            },
            Expr::UnaryOp { op, expr } => Expr::UnaryOp {
                op: *op,
                expr: bind(expr)?,
            },
            Expr::Paren(inner) => Expr::Paren(bind(inner)?),
            other => other.clone(),
        })
    }
}

fn has_exists(expr: &Expr) -> bool {
    match expr {
        Expr::Exists { .. } => true,
        Expr::BinaryOp { left, right, .. } => has_exists(left) || has_exists(right),
        Expr::UnaryOp { expr, .. } | Expr::Paren(expr) => has_exists(expr),
        _ => false,
    }
}

/// Replace columns qualified with any name but `inner` by the outer row's
/// value.
fn substitute_outer(expr: &Expr, inner: &str, row: &Row) -> Expr {
    let sub = |e: &Expr| Box::new(substitute_outer(e, inner, row));
    let all = |items: &[Expr]| {
        items
            .iter()
            .map(|e| substitute_outer(e, inner, row))
            .collect::<Vec<_>>()
    };
    match expr {
        Expr::Column {
            table: Some(table),
            column,
        } if !table.eq_ignore_ascii_case(inner) => row
            .get(column)
            .map_or_else(crate::sql::lit_null, Value::to_literal),
        Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
            left: sub(left),
            op: *op,
            right: sub(right),
        },
        Expr::UnaryOp { op, expr } => Expr::UnaryOp {
            op: *op,
            expr: sub(expr),
        },
        Expr::Paren(e) => Expr::Paren(sub(e)),
        Expr::Function {
            name,
            args,
            distinct,
        } => Expr::Function {
            name: name.clone(),
            args: all(args),
            distinct: *distinct,
        },
        Expr::Cast { expr, ty } => Expr::Cast {
            expr: sub(expr),
            ty: *ty,
        },
        Expr::IsNull { expr, negated } => Expr::IsNull {
            expr: sub(expr),
            negated: *negated,
        },
        Expr::In {
            expr,
            values,
            negated,
        } => Expr::In {
            expr: sub(expr),
            values: all(values),
            negated: *negated,
        },
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => Expr::Between {
            expr: sub(expr),
            low: sub(low),
            high: sub(high),
            negated: *negated,
        },
        Expr::LikeEscape {
            expr,
            pattern,
            escape_char,
            negated,
        } => Expr::LikeEscape {
            expr: sub(expr),
            pattern: sub(pattern),
            escape_char: *escape_char,
            negated: *negated,
        },
        Expr::Case {
            operand,
            when_clauses,
            else_clause,
        } => Expr::Case {
            operand: operand.as_deref().map(sub),
            when_clauses: when_clauses
                .iter()
                .map(|(w, t)| (substitute_outer(w, inner, row), substitute_outer(t, inner, row)))
                .collect(),
            else_clause: else_clause.as_deref().map(sub),
        },
        other => other.clone(),
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn execute(&self, query: &Query) -> Result<ResultSet, DataSourceError> {
        let result = self.run_query(query)?;
        debug!(table = %self.table, rows = result.len(), "executed query");
        Ok(result)
    }

    async fn distinct_values(&self, field: &str) -> Result<Vec<Value>, DataSourceError> {
        if !self.types.contains_key(field) {
            return Err(DataSourceError::UnknownColumn(field.to_string()));
        }
        let mut values: Vec<Value> = self
            .rows
            .iter()
            .map(|row| row.get(field).cloned().unwrap_or(Value::Null))
            .collect();
        values.sort_by(|a, b| a.compare(b).unwrap_or(Ordering::Equal));
        values.dedup_by(|a, b| a.compare(b) == Some(Ordering::Equal));
        Ok(values)
    }

    fn field_type(&self, field: &str) -> ScalarType {
        self.types.get(field).copied().unwrap_or_default()
    }
}

fn typed_value(raw: &serde_json::Value, ty: ScalarType) -> Result<Value, sync::ParseError> {
    use serde_json::Value as Json;

    if raw.is_null() {
        return Ok(Value::Null);
    }
    let text = match raw {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    };
    match ty {
        ScalarType::Integer => match raw.as_i64() {
            Some(n) => Ok(Value::Int(n)),
            None => sync::parse_decimal(&text).map(Value::Decimal),
        },
        ScalarType::Decimal => sync::parse_decimal(&text).map(Value::Decimal),
        ScalarType::Boolean => match raw {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            _ => sync::parse_bool(&text).map(Value::Bool),
        },
        ScalarType::Date => sync::parse_date_time(&text).map(|t| Value::Date(t.date())),
        ScalarType::Timestamp => sync::parse_date_time(&text).map(Value::Timestamp),
        ScalarType::Text => Ok(Value::Text(text)),
        ScalarType::Other => Ok(Value::from_json(raw)),
    }
}

fn same_values(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.compare(y) == Some(Ordering::Equal))
}

/// NULLs sort first ascending and last descending unless the ORDER BY item
/// says otherwise.
fn compare_keys(a: &[Value], b: &[Value], order_by: &[OrderByExpr]) -> Ordering {
    for ((x, y), item) in a.iter().zip(b).zip(order_by) {
        let desc = item.dir == Some(SortDir::Desc);
        let nulls_first = match item.nulls {
            Some(NullsOrder::First) => true,
            Some(NullsOrder::Last) => false,
            None => !desc,
        };
        let ordering = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let o = x.compare(y).unwrap_or(Ordering::Equal);
                if desc {
                    o.reverse()
                } else {
                    o
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
