//! Literal coercion against a column's native type.
//!
//! Grid payloads carry most literals as text. Before a literal is compared
//! with a column it is converted to the column's type, and numeric columns
//! are widened to `DECIMAL` so both sides have the same precision.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::model::{ScalarType, Value};
use crate::sql::{cast, CastType, Expr};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Could not parse '{0}' as a date")]
    InvalidDate(String),

    #[error("Could not parse '{0}' as a number")]
    InvalidNumber(String),

    #[error("Could not parse '{0}' as a boolean")]
    InvalidBoolean(String),
}

/// Local date-time layouts tried after the ISO forms, in order.
const DATE_TIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_PATTERNS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y"];

/// Coerce `value` to the type of the column `expr` and return a pair that
/// can be compared directly.
///
/// Synchronizing an already synchronized pair returns it unchanged.
pub fn synchronize(expr: Expr, ty: ScalarType, value: Value) -> Result<(Expr, Value), ParseError> {
    if value.is_null() {
        return Ok((expr, value));
    }

    match ty {
        ScalarType::Integer | ScalarType::Decimal => {
            let number = to_decimal(&value)?;
            Ok((widen_decimal(expr), Value::Decimal(number)))
        }
        ScalarType::Date => {
            let date = match value {
                Value::Date(d) => d,
                Value::Timestamp(t) => t.date(),
                Value::Text(s) => parse_date_time(&s)?.date(),
                other => return Err(ParseError::InvalidDate(other.to_string())),
            };
            Ok((expr, Value::Date(date)))
        }
        ScalarType::Timestamp => {
            let ts = match value {
                Value::Timestamp(t) => t,
                Value::Date(d) => d.and_time(NaiveTime::MIN),
                Value::Text(s) => parse_date_time(&s)?,
                other => return Err(ParseError::InvalidDate(other.to_string())),
            };
            Ok((expr, Value::Timestamp(ts)))
        }
        ScalarType::Boolean => {
            let b = match value {
                Value::Bool(b) => b,
                Value::Text(s) => parse_bool(&s)?,
                other => return Err(ParseError::InvalidBoolean(other.to_string())),
            };
            Ok((expr, Value::Bool(b)))
        }
        ScalarType::Text => match value {
            Value::Text(_) => Ok((expr, value)),
            other => Ok((expr, Value::Text(other.to_string()))),
        },
        ScalarType::Other => Ok((expr, value)),
    }
}

/// [`synchronize`] for a textual literal.
pub fn synchronize_text(
    expr: Expr,
    ty: ScalarType,
    text: &str,
) -> Result<(Expr, Value), ParseError> {
    synchronize(expr, ty, Value::Text(text.to_string()))
}

/// `CAST(expr AS DECIMAL)`, unless the expression already is one.
pub fn widen_decimal(expr: Expr) -> Expr {
    match expr {
        Expr::Cast {
            ty: CastType::Decimal,
            ..
        } => expr,
        other => cast(other, CastType::Decimal),
    }
}

pub fn parse_decimal(s: &str) -> Result<Decimal, ParseError> {
    let trimmed = s.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

pub fn parse_bool(s: &str) -> Result<bool, ParseError> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ParseError::InvalidBoolean(s.to_string()))
    }
}

/// Parse a date or date-time literal.
///
/// Tries an ISO instant or offset date-time (an optional trailing `[Zone]`
/// is ignored, the result is UTC), then the local date-time patterns, then
/// the date-only patterns at midnight.
pub fn parse_date_time(s: &str) -> Result<NaiveDateTime, ParseError> {
    let trimmed = s.trim();
    let without_zone = match trimmed.find('[') {
        Some(i) if trimmed.ends_with(']') => &trimmed[..i],
        _ => trimmed,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(without_zone) {
        return Ok(dt.naive_utc());
    }

    for pattern in DATE_TIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Ok(dt);
        }
    }

    for pattern in DATE_PATTERNS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, pattern) {
            return Ok(d.and_time(NaiveTime::MIN));
        }
    }

    Err(ParseError::InvalidDate(s.to_string()))
}

fn to_decimal(value: &Value) -> Result<Decimal, ParseError> {
    match value {
        Value::Text(s) => parse_decimal(s),
        other => other
            .as_decimal()
            .ok_or_else(|| ParseError::InvalidNumber(other.to_string())),
    }
}
