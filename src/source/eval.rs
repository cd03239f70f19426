//! Expression evaluation over in-memory rows.
//!
//! Follows SQL three-valued logic: comparisons with NULL yield NULL and a
//! predicate only passes when it evaluates to TRUE.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;
use rust_decimal::Decimal;

use super::DataSourceError;
use crate::model::{ScalarType, Value};
use crate::sql::{BinaryOperator, CastType, Expr, Literal, UnaryOperator};
use crate::sync;

pub(crate) type Row = HashMap<String, Value>;

/// What column references resolve against.
#[derive(Clone, Copy)]
pub(crate) enum Scope<'a> {
    Row(&'a Row),
    /// Rows of one group. Bare columns read the first row; aggregates fold
    /// over all of them.
    Group(&'a [&'a Row]),
}

const AGGREGATES: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

pub(crate) fn is_aggregate(name: &str) -> bool {
    AGGREGATES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

/// Whether an aggregate call appears anywhere in the expression.
pub(crate) fn contains_aggregate(expr: &Expr) -> bool {
    match expr {
        Expr::Function { name, args, .. } => {
            is_aggregate(name) || args.iter().any(contains_aggregate)
        }
        Expr::BinaryOp { left, right, .. } => contains_aggregate(left) || contains_aggregate(right),
        Expr::UnaryOp { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::Paren(expr) => contains_aggregate(expr),
        Expr::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            operand.as_deref().is_some_and(contains_aggregate)
                || when_clauses
                    .iter()
                    .any(|(w, t)| contains_aggregate(w) || contains_aggregate(t))
                || else_clause.as_deref().is_some_and(contains_aggregate)
        }
        Expr::In { expr, values, .. } => {
            contains_aggregate(expr) || values.iter().any(contains_aggregate)
        }
        Expr::InSubquery { expr, .. } => contains_aggregate(expr),
        Expr::Exists { .. } => false,
        Expr::Between {
            expr, low, high, ..
        } => contains_aggregate(expr) || contains_aggregate(low) || contains_aggregate(high),
        Expr::LikeEscape { expr, pattern, .. } => {
            contains_aggregate(expr) || contains_aggregate(pattern)
        }
        Expr::Column { .. } | Expr::Literal(_) | Expr::Truth(_) | Expr::Star { .. } => false,
    }
}

pub(crate) struct Evaluator<'a> {
    types: &'a HashMap<String, ScalarType>,
    patterns: RefCell<HashMap<(String, char), Regex>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(types: &'a HashMap<String, ScalarType>) -> Self {
        Self {
            types,
            patterns: RefCell::new(HashMap::new()),
        }
    }

    /// Evaluate a predicate; only TRUE passes.
    pub fn test(&self, expr: &Expr, scope: Scope<'_>) -> Result<bool, DataSourceError> {
        Ok(matches!(self.eval(expr, scope)?, Value::Bool(true)))
    }

    pub fn eval(&self, expr: &Expr, scope: Scope<'_>) -> Result<Value, DataSourceError> {
        match expr {
            Expr::Column { column, .. } => self.column(column, scope),
            Expr::Literal(lit) => Ok(literal(lit)),
            Expr::Truth(b) => Ok(Value::Bool(*b)),
            Expr::Paren(inner) => self.eval(inner, scope),
            Expr::BinaryOp { left, op, right } => self.binary(left, *op, right, scope),
            Expr::UnaryOp { op, expr } => {
                let value = self.eval(expr, scope)?;
                match (op, value) {
                    (_, Value::Null) => Ok(Value::Null),
                    (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOperator::Minus, v) => v
                        .as_decimal()
                        .map(|d| Value::Decimal(-d))
                        .ok_or_else(|| type_error("negate", &v)),
                    (UnaryOperator::Not, v) => Err(type_error("NOT", &v)),
                }
            }
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                if is_aggregate(name) {
                    self.aggregate(name, args, *distinct, scope)
                } else {
                    self.scalar_function(name, args, scope)
                }
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let subject = operand
                    .as_deref()
                    .map(|o| self.eval(o, scope))
                    .transpose()?;
                for (when, then) in when_clauses {
                    let hit = match &subject {
                        Some(s) => {
                            let w = self.eval(when, scope)?;
                            s.compare(&w) == Some(Ordering::Equal) && !s.is_null()
                        }
                        None => self.test(when, scope)?,
                    };
                    if hit {
                        return self.eval(then, scope);
                    }
                }
                match else_clause {
                    Some(e) => self.eval(e, scope),
                    None => Ok(Value::Null),
                }
            }
            Expr::Cast { expr, ty } => cast(self.eval(expr, scope)?, *ty),
            Expr::In {
                expr,
                values,
                negated,
            } => {
                let subject = self.eval(expr, scope)?;
                if subject.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for candidate in values {
                    let v = self.eval(candidate, scope)?;
                    if v.is_null() {
                        saw_null = true;
                    } else if subject.compare(&v) == Some(Ordering::Equal) {
                        return Ok(Value::Bool(!negated));
                    }
                }
                if saw_null {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Bool(*negated))
                }
            }
            Expr::InSubquery { .. } => Err(DataSourceError::Unsupported(
                "unresolved IN subquery".into(),
            )),
            Expr::Exists { .. } => Err(DataSourceError::Unsupported(
                "unbound EXISTS subquery".into(),
            )),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let v = self.eval(expr, scope)?;
                let lo = self.eval(low, scope)?;
                let hi = self.eval(high, scope)?;
                if v.is_null() || lo.is_null() || hi.is_null() {
                    return Ok(Value::Null);
                }
                let inside = matches!(v.compare(&lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(v.compare(&hi), Some(Ordering::Less | Ordering::Equal));
                Ok(Value::Bool(inside != *negated))
            }
            Expr::IsNull { expr, negated } => {
                let v = self.eval(expr, scope)?;
                Ok(Value::Bool(v.is_null() != *negated))
            }
            Expr::LikeEscape {
                expr,
                pattern,
                escape_char,
                negated,
            } => {
                let v = self.eval(expr, scope)?;
                let p = self.eval(pattern, scope)?;
                match (v, p) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (v, p) => {
                        let matched = self.like(&v.to_string(), &p.to_string(), *escape_char)?;
                        Ok(Value::Bool(matched != *negated))
                    }
                }
            }
            Expr::Star { .. } => Err(DataSourceError::Unsupported(
                "* outside COUNT(*)".into(),
            )),
        }
    }

    fn column(&self, name: &str, scope: Scope<'_>) -> Result<Value, DataSourceError> {
        if !self.types.contains_key(name) {
            return Err(DataSourceError::UnknownColumn(name.to_string()));
        }
        let row = match scope {
            Scope::Row(row) => Some(row),
            Scope::Group(rows) => rows.first().copied(),
        };
        Ok(row
            .and_then(|r| r.get(name))
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn binary(
        &self,
        left: &Expr,
        op: BinaryOperator,
        right: &Expr,
        scope: Scope<'_>,
    ) -> Result<Value, DataSourceError> {
        match op {
            BinaryOperator::And => {
                let l = truth(self.eval(left, scope)?)?;
                if l == Some(false) {
                    return Ok(Value::Bool(false));
                }
                let r = truth(self.eval(right, scope)?)?;
                Ok(match (l, r) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                })
            }
            BinaryOperator::Or => {
                let l = truth(self.eval(left, scope)?)?;
                if l == Some(true) {
                    return Ok(Value::Bool(true));
                }
                let r = truth(self.eval(right, scope)?)?;
                Ok(match (l, r) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            _ => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                if l.is_null() || r.is_null() {
                    return Ok(Value::Null);
                }
                let ordering = l.compare(&r);
                let result = match op {
                    BinaryOperator::Eq => Value::Bool(ordering == Some(Ordering::Equal)),
                    BinaryOperator::Ne => Value::Bool(ordering != Some(Ordering::Equal)),
                    BinaryOperator::Lt => compared(ordering, |o| o == Ordering::Less),
                    BinaryOperator::Lte => compared(ordering, |o| o != Ordering::Greater),
                    BinaryOperator::Gt => compared(ordering, |o| o == Ordering::Greater),
                    BinaryOperator::Gte => compared(ordering, |o| o != Ordering::Less),
                    _ => arithmetic(op, &l, &r)?,
                };
                Ok(result)
            }
        }
    }

    fn aggregate(
        &self,
        name: &str,
        args: &[Expr],
        distinct: bool,
        scope: Scope<'_>,
    ) -> Result<Value, DataSourceError> {
        let Scope::Group(rows) = scope else {
            return Err(DataSourceError::Unsupported(format!(
                "aggregate {} outside a group",
                name
            )));
        };
        let name = name.to_ascii_uppercase();

        if name == "COUNT" && matches!(args.first(), Some(Expr::Star { .. })) {
            return Ok(Value::Int(rows.len() as i64));
        }

        let arg = args
            .first()
            .ok_or_else(|| DataSourceError::Evaluation(format!("{} needs an argument", name)))?;
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let v = self.eval(arg, Scope::Row(row))?;
            if !v.is_null() {
                values.push(v);
            }
        }
        if distinct {
            let mut unique: Vec<Value> = Vec::with_capacity(values.len());
            for v in values {
                if !unique.iter().any(|u| u.compare(&v) == Some(Ordering::Equal)) {
                    unique.push(v);
                }
            }
            values = unique;
        }

        match name.as_str() {
            "COUNT" => Ok(Value::Int(values.len() as i64)),
            "SUM" | "AVG" => {
                if values.is_empty() {
                    return Ok(Value::Null);
                }
                let mut total = Decimal::ZERO;
                for v in &values {
                    let d = v.as_decimal().ok_or_else(|| type_error(&name, v))?;
                    total = total
                        .checked_add(d)
                        .ok_or_else(|| DataSourceError::Evaluation("SUM overflow".into()))?;
                }
                if name == "SUM" {
                    Ok(Value::Decimal(total))
                } else {
                    total
                        .checked_div(Decimal::from(values.len() as i64))
                        .map(Value::Decimal)
                        .ok_or_else(|| DataSourceError::Evaluation("AVG overflow".into()))
                }
            }
            "MIN" | "MAX" => {
                let want = if name == "MIN" {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                Ok(values
                    .into_iter()
                    .reduce(|best, v| if v.compare(&best) == Some(want) { v } else { best })
                    .unwrap_or(Value::Null))
            }
            other => Err(DataSourceError::Unsupported(other.to_string())),
        }
    }

    fn scalar_function(
        &self,
        name: &str,
        args: &[Expr],
        scope: Scope<'_>,
    ) -> Result<Value, DataSourceError> {
        let values = args
            .iter()
            .map(|a| self.eval(a, scope))
            .collect::<Result<Vec<_>, _>>()?;
        let first = values.first().cloned().unwrap_or(Value::Null);

        match name.to_ascii_uppercase().as_str() {
            "LOWER" => Ok(map_text(first, |s| s.to_lowercase())),
            "UPPER" => Ok(map_text(first, |s| s.to_uppercase())),
            "TRIM" => Ok(map_text(first, |s| s.trim().to_string())),
            "LENGTH" | "LEN" => Ok(match first {
                Value::Null => Value::Null,
                v => Value::Int(v.to_string().chars().count() as i64),
            }),
            "CONCAT" => Ok(Value::Text(
                values
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(Value::to_string)
                    .collect(),
            )),
            "COALESCE" | "IFNULL" | "ISNULL" => Ok(values
                .into_iter()
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null)),
            other => Err(DataSourceError::Unsupported(format!("function {}", other))),
        }
    }

    fn like(&self, text: &str, pattern: &str, escape: char) -> Result<bool, DataSourceError> {
        let key = (pattern.to_string(), escape);
        if let Some(re) = self.patterns.borrow().get(&key) {
            return Ok(re.is_match(text));
        }
        let re = like_regex(pattern, escape)?;
        let matched = re.is_match(text);
        self.patterns.borrow_mut().insert(key, re);
        Ok(matched)
    }
}

/// Translate a LIKE pattern into an anchored regex.
pub(crate) fn like_regex(pattern: &str, escape: char) -> Result<Regex, DataSourceError> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            c if c == escape => {
                if let Some(next) = chars.next() {
                    re.push_str(&regex::escape(&next.to_string()));
                }
            }
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| DataSourceError::Evaluation(e.to_string()))
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Decimal(d) => Value::Decimal(*d),
        Literal::String(s) => Value::Text(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Date(d) => Value::Date(*d),
        Literal::Timestamp(t) => Value::Timestamp(*t),
        Literal::Null => Value::Null,
    }
}

fn truth(value: Value) -> Result<Option<bool>, DataSourceError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        other => Err(type_error("boolean logic", &other)),
    }
}

fn compared(ordering: Option<Ordering>, f: impl Fn(Ordering) -> bool) -> Value {
    match ordering {
        Some(o) => Value::Bool(f(o)),
        None => Value::Null,
    }
}

fn arithmetic(op: BinaryOperator, l: &Value, r: &Value) -> Result<Value, DataSourceError> {
    let a = l.as_decimal().ok_or_else(|| type_error("arithmetic", l))?;
    let b = r.as_decimal().ok_or_else(|| type_error("arithmetic", r))?;
    let result = match op {
        BinaryOperator::Plus => a.checked_add(b),
        BinaryOperator::Minus => a.checked_sub(b),
        BinaryOperator::Mul => a.checked_mul(b),
        BinaryOperator::Div => a.checked_div(b),
        other => {
            return Err(DataSourceError::Unsupported(format!("operator {:?}", other)));
        }
    };
    result
        .map(Value::Decimal)
        .ok_or_else(|| DataSourceError::Evaluation("arithmetic overflow or division by zero".into()))
}

fn cast(value: Value, ty: CastType) -> Result<Value, DataSourceError> {
    if value.is_null() {
        return Ok(value);
    }
    match ty {
        CastType::Text => Ok(Value::Text(value.to_string())),
        CastType::Decimal => match &value {
            Value::Text(s) => sync::parse_decimal(s)
                .map(Value::Decimal)
                .map_err(|e| DataSourceError::Evaluation(e.to_string())),
            Value::Bool(b) => Ok(Value::Decimal(Decimal::from(*b as i64))),
            other => other
                .as_decimal()
                .map(Value::Decimal)
                .ok_or_else(|| type_error("CAST AS DECIMAL", other)),
        },
        CastType::Date | CastType::Timestamp => {
            let ts = match &value {
                Value::Date(d) => d.and_time(chrono::NaiveTime::MIN),
                Value::Timestamp(t) => *t,
                Value::Text(s) => sync::parse_date_time(s)
                    .map_err(|e| DataSourceError::Evaluation(e.to_string()))?,
                other => return Err(type_error("CAST AS DATE", other)),
            };
            Ok(if ty == CastType::Date {
                Value::Date(ts.date())
            } else {
                Value::Timestamp(ts)
            })
        }
    }
}

fn map_text(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Text(s) => Value::Text(f(&s)),
        other => Value::Text(f(&other.to_string())),
    }
}

fn type_error(operation: &str, value: &Value) -> DataSourceError {
    DataSourceError::Evaluation(format!("cannot apply {} to {}", operation, value))
}
