//! Compilation of recognized filter models into SQL predicates.
//!
//! Every operator is a free function over the compared expression; the
//! filter enums are dispatched exhaustively in one place.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::advanced::{AdvancedCondition, AdvancedFilter, BooleanAdvancedType};
use super::params::{
    ColumnFilter, DateFilterParams, ScalarFilterParams, SetFilterParams, TextFilterParams,
    TextMatcherParams,
};
use super::simple::{
    DateFilterModel, NumberFilterModel, SetFilterModel, SimpleFilter, SimpleFilterType,
};
use super::JoinOperator;
use crate::error::{QueryError, QueryResult, ValidationError};
use crate::model::{ColumnRegistry, ScalarType, Value};
use crate::sql::{
    cast, concat, conjunction, disjunction, falsehood, lit_bool, lit_decimal, lit_str, lower,
    CastType, Expr, ExprExt, Literal,
};
use crate::sync;

const LIKE_ESCAPE: char = '\\';

static DEFAULT_TEXT: Lazy<TextFilterParams> = Lazy::new(TextFilterParams::default);
static DEFAULT_SCALAR: Lazy<ScalarFilterParams> = Lazy::new(ScalarFilterParams::default);
static DEFAULT_DATE: Lazy<DateFilterParams> = Lazy::new(DateFilterParams::default);
static DEFAULT_SET: Lazy<SetFilterParams> = Lazy::new(SetFilterParams::default);

/// Native type lookup for fields.
pub trait FieldTypes {
    fn field_type(&self, field: &str) -> ScalarType;
}

impl FieldTypes for HashMap<String, ScalarType> {
    fn field_type(&self, field: &str) -> ScalarType {
        self.get(field).copied().unwrap_or_default()
    }
}

/// The expression a filter is applied to.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTarget {
    /// Request path used in validation messages.
    pub label: String,
    pub expr: Expr,
    pub ty: ScalarType,
}

impl FilterTarget {
    pub fn new(label: impl Into<String>, expr: Expr, ty: ScalarType) -> Self {
        Self {
            label: label.into(),
            expr,
            ty,
        }
    }

    fn field(&self, key: &str) -> String {
        format!("{}.{}", self.label, key)
    }
}

/// Compiles filter models against columns or arbitrary expressions.
pub struct PredicateCompiler<'a> {
    columns: &'a ColumnRegistry,
    types: &'a dyn FieldTypes,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(columns: &'a ColumnRegistry, types: &'a dyn FieldTypes) -> Self {
        Self { columns, types }
    }

    /// Target for a plain column reference.
    pub fn column_target(&self, field: &str) -> FilterTarget {
        FilterTarget::new(
            format!("filterModel.{}", field),
            crate::sql::col(field),
            self.types.field_type(field),
        )
    }

    /// Compile a column filter against its own column.
    pub fn compile_column(&self, field: &str, filter: &SimpleFilter) -> QueryResult<Expr> {
        let target = self.column_target(field);
        self.compile_simple(&target, filter, self.columns.filter_for(field))
    }

    /// Compile a column filter against `target` using `params`, falling back
    /// to default parameters when none are configured for the model's family.
    pub fn compile_simple(
        &self,
        target: &FilterTarget,
        filter: &SimpleFilter,
        params: Option<&ColumnFilter>,
    ) -> QueryResult<Expr> {
        match filter {
            SimpleFilter::Text(model) => {
                let p = params.and_then(ColumnFilter::text_params).unwrap_or(&*DEFAULT_TEXT);
                if !p.allows(model.kind) {
                    return Err(option_not_allowed(target, model.kind));
                }
                text_predicate(target, model.kind, model.filter.as_deref(), p)
            }
            SimpleFilter::Number(model) => {
                let p = params.and_then(ColumnFilter::number_params).unwrap_or(&*DEFAULT_SCALAR);
                number_predicate(target, model, p)
            }
            SimpleFilter::Date(model) => {
                let p = params.and_then(ColumnFilter::date_params).unwrap_or(&*DEFAULT_DATE);
                date_predicate(target, model, p)
            }
            SimpleFilter::Set(model) => {
                let p = params.and_then(ColumnFilter::set_params).unwrap_or(&*DEFAULT_SET);
                set_predicate(target, model, p)
            }
            SimpleFilter::Multi(children) => {
                let mut predicates = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    let Some(child) = child else { continue };
                    let child_params = match params {
                        Some(ColumnFilter::Multi(all)) => all.get(i),
                        other => other,
                    };
                    predicates.push(self.compile_simple(target, child, child_params)?);
                }
                Ok(conjunction(predicates))
            }
            SimpleFilter::Combined {
                operator,
                conditions,
            } => {
                let predicates = conditions
                    .iter()
                    .map(|c| self.compile_simple(target, c, params))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(combine(*operator, predicates))
            }
        }
    }

    pub fn compile_advanced(&self, filter: &AdvancedFilter) -> QueryResult<Expr> {
        match filter {
            AdvancedFilter::Join {
                operator,
                conditions,
            } => {
                let predicates = conditions
                    .iter()
                    .map(|c| self.compile_advanced(c))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(combine(*operator, predicates))
            }
            AdvancedFilter::Column { col_id, condition } => {
                let target = self.column_target(col_id);
                let params = self.columns.filter_for(col_id);
                self.compile_condition(&target, condition, params)
            }
        }
    }

    fn compile_condition(
        &self,
        target: &FilterTarget,
        condition: &AdvancedCondition,
        params: Option<&ColumnFilter>,
    ) -> QueryResult<Expr> {
        match condition {
            AdvancedCondition::Text { kind, filter } | AdvancedCondition::Object { kind, filter } => {
                let p = params.and_then(ColumnFilter::text_params).unwrap_or(&*DEFAULT_TEXT);
                text_predicate(target, (*kind).into(), filter.as_deref(), p)
            }
            AdvancedCondition::Number { kind, filter } => {
                let p = params.and_then(ColumnFilter::number_params).unwrap_or(&*DEFAULT_SCALAR);
                scalar_predicate(
                    target,
                    (*kind).into(),
                    sync::widen_decimal(target.expr.clone()),
                    filter.map(lit_decimal),
                    None,
                    p,
                )
            }
            AdvancedCondition::Date { kind, filter }
            | AdvancedCondition::DateString { kind, filter } => {
                let p = params.and_then(ColumnFilter::date_params).unwrap_or(&*DEFAULT_DATE);
                let (expr, literal) = match filter {
                    Some(date) => {
                        check_date(target, "filter", *date, p)?;
                        let (expr, value) = synchronize(target, Value::Date(*date), "filter")?;
                        (expr, Some(value.to_literal()))
                    }
                    None => (target.expr.clone(), None),
                };
                scalar_predicate(target, (*kind).into(), expr, literal, None, &p.scalar)
            }
            AdvancedCondition::Boolean { kind } => Ok(boolean_predicate(&target.expr, *kind)),
        }
    }
}

fn combine(operator: JoinOperator, predicates: Vec<Expr>) -> Expr {
    match operator {
        JoinOperator::And => conjunction(predicates),
        JoinOperator::Or => disjunction(predicates),
    }
}

// =============================================================================
// Text
// =============================================================================

/// Build a text predicate.
///
/// The column is cast to text when it is not textual. Unless a formatter is
/// configured, case-insensitive matching lowers both sides. Trimming applies
/// to the literal only.
pub fn text_predicate(
    target: &FilterTarget,
    kind: SimpleFilterType,
    filter: Option<&str>,
    params: &TextFilterParams,
) -> QueryResult<Expr> {
    let raw = match target.ty {
        ScalarType::Text | ScalarType::Other => target.expr.clone(),
        _ => cast(target.expr.clone(), CastType::Text),
    };
    let value = match &params.text_formatter {
        Some(format) => format(raw.clone()),
        None if !params.case_sensitive => lower(raw.clone()),
        None => raw.clone(),
    };
    let filter_text = filter.map(|text| {
        let text = if params.trim_input { text.trim() } else { text };
        match &params.text_formatter {
            Some(format) => format(lit_str(text)),
            None if !params.case_sensitive => lit_str(&text.to_lowercase()),
            None => lit_str(text),
        }
    });

    if let Some(matcher) = &params.text_matcher {
        return Ok(matcher(&TextMatcherParams {
            filter_option: kind,
            value,
            filter_text,
        }));
    }

    let required = || {
        filter_text.clone().ok_or_else(|| {
            QueryError::invalid(target.field("filter"), format!("is required for '{}'", kind))
        })
    };

    match kind {
        SimpleFilterType::Empty | SimpleFilterType::Blank => {
            Ok(raw.clone().is_null().or(raw.eq(lit_str(""))))
        }
        SimpleFilterType::NotBlank => Ok(raw.clone().is_not_null().and(raw.ne(lit_str("")))),
        SimpleFilterType::Equals => Ok(value.eq(required()?)),
        SimpleFilterType::NotEqual => Ok(value.ne(required()?)),
        SimpleFilterType::Contains => {
            Ok(value.like_escape(like_pattern(required()?, true, true), LIKE_ESCAPE))
        }
        SimpleFilterType::NotContains => {
            Ok(value.not_like_escape(like_pattern(required()?, true, true), LIKE_ESCAPE))
        }
        SimpleFilterType::StartsWith => {
            Ok(value.like_escape(like_pattern(required()?, false, true), LIKE_ESCAPE))
        }
        SimpleFilterType::EndsWith => {
            Ok(value.like_escape(like_pattern(required()?, true, false), LIKE_ESCAPE))
        }
        other => Err(QueryError::unrecognized("text filter option", other)),
    }
}

/// Wrap a text operand in `%` wildcards. String literals are escaped and
/// folded into a single literal.
pub fn like_pattern(text: Expr, leading: bool, trailing: bool) -> Expr {
    let lead = if leading { "%" } else { "" };
    let trail = if trailing { "%" } else { "" };
    match text {
        Expr::Literal(Literal::String(s)) => {
            lit_str(&format!("{}{}{}", lead, escape_like(&s), trail))
        }
        other => {
            let mut parts = Vec::with_capacity(3);
            if leading {
                parts.push(lit_str("%"));
            }
            parts.push(other);
            if trailing {
                parts.push(lit_str("%"));
            }
            concat(parts)
        }
    }
}

pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Number and date
// =============================================================================

fn number_predicate(
    target: &FilterTarget,
    model: &NumberFilterModel,
    params: &ScalarFilterParams,
) -> QueryResult<Expr> {
    if !params.allows(model.kind) {
        return Err(option_not_allowed(target, model.kind));
    }
    scalar_predicate(
        target,
        model.kind,
        sync::widen_decimal(target.expr.clone()),
        model.filter.map(lit_decimal),
        model.filter_to.map(lit_decimal),
        params,
    )
}

fn date_predicate(
    target: &FilterTarget,
    model: &DateFilterModel,
    params: &DateFilterParams,
) -> QueryResult<Expr> {
    if !params.scalar.allows(model.kind) {
        return Err(option_not_allowed(target, model.kind));
    }

    let mut expr = target.expr.clone();
    let mut literal = |key: &str, dt: Option<chrono::NaiveDateTime>| -> QueryResult<Option<Expr>> {
        let Some(dt) = dt else { return Ok(None) };
        check_date(target, key, dt.date(), params)?;
        let (synced, value) = synchronize(target, Value::Timestamp(dt), key)?;
        expr = synced;
        Ok(Some(value.to_literal()))
    };
    let from = literal("dateFrom", model.date_from)?;
    let to = literal("dateTo", model.date_to)?;

    scalar_predicate(target, model.kind, expr, from, to, &params.scalar)
}

/// Null checks, comparisons and ranges shared by number and date filters.
/// Comparisons OR in `IS NULL` when the matching include-blanks flag is set.
pub fn scalar_predicate(
    target: &FilterTarget,
    kind: SimpleFilterType,
    expr: Expr,
    from: Option<Expr>,
    to: Option<Expr>,
    params: &ScalarFilterParams,
) -> QueryResult<Expr> {
    let need = |value: Option<Expr>, key: &str| {
        value.ok_or_else(|| {
            QueryError::invalid(target.field(key), format!("is required for '{}'", kind))
        })
    };
    let from_key = if target.ty.is_temporal() { "dateFrom" } else { "filter" };
    let to_key = if target.ty.is_temporal() { "dateTo" } else { "filterTo" };

    let predicate = match kind {
        SimpleFilterType::Empty | SimpleFilterType::Blank => return Ok(expr.is_null()),
        SimpleFilterType::NotBlank => return Ok(expr.is_not_null()),
        SimpleFilterType::Equals => expr.clone().eq(need(from, from_key)?),
        SimpleFilterType::NotEqual => expr.clone().ne(need(from, from_key)?),
        SimpleFilterType::LessThan => expr.clone().lt(need(from, from_key)?),
        SimpleFilterType::LessThanOrEqual => expr.clone().lte(need(from, from_key)?),
        SimpleFilterType::GreaterThan => expr.clone().gt(need(from, from_key)?),
        SimpleFilterType::GreaterThanOrEqual => expr.clone().gte(need(from, from_key)?),
        SimpleFilterType::InRange => {
            let low = need(from, from_key)?;
            let high = need(to, to_key)?;
            if params.in_range_inclusive {
                expr.clone().gte(low).and(expr.clone().lte(high))
            } else {
                expr.clone().gt(low).and(expr.clone().lt(high))
            }
        }
        other => return Err(QueryError::unrecognized("scalar filter option", other)),
    };

    if params.includes_blanks(kind) {
        Ok(predicate.or(expr.is_null()))
    } else {
        Ok(predicate)
    }
}

fn check_date(
    target: &FilterTarget,
    key: &str,
    date: chrono::NaiveDate,
    params: &DateFilterParams,
) -> QueryResult<()> {
    params.check_bounds(date).map_err(|message| {
        QueryError::InvalidRequest(vec![ValidationError::new(target.field(key), message)
            .with_rejected(serde_json::Value::String(date.to_string()))])
    })
}

// =============================================================================
// Set and boolean
// =============================================================================

/// Membership test. An empty selection matches nothing; the blank entry
/// matches NULL.
fn set_predicate(
    target: &FilterTarget,
    model: &SetFilterModel,
    params: &SetFilterParams,
) -> QueryResult<Expr> {
    if model.values.is_empty() {
        return Ok(falsehood());
    }

    let includes_null = model.values.iter().any(Option::is_none);
    let members: Vec<&str> = model.values.iter().flatten().map(String::as_str).collect();

    let membership = if members.is_empty() {
        None
    } else if matches!(target.ty, ScalarType::Text | ScalarType::Other) {
        let (expr, literals): (Expr, Vec<Expr>) = match &params.text_formatter {
            Some(format) => (
                format(target.expr.clone()),
                members.iter().map(|m| format(lit_str(m))).collect(),
            ),
            None if !params.case_sensitive => (
                lower(target.expr.clone()),
                members.iter().map(|m| lit_str(&m.to_lowercase())).collect(),
            ),
            None => (
                target.expr.clone(),
                members.iter().map(|m| lit_str(m)).collect(),
            ),
        };
        Some(expr.in_list(literals))
    } else {
        let mut expr = target.expr.clone();
        let mut literals = Vec::with_capacity(members.len());
        for member in &members {
            let (synced, value) = synchronize(target, Value::Text(member.to_string()), "values")?;
            expr = synced;
            literals.push(value.to_literal());
        }
        Some(expr.in_list(literals))
    };

    Ok(match (membership, includes_null) {
        (Some(m), true) => m.or(target.expr.clone().is_null()),
        (Some(m), false) => m,
        (None, _) => target.expr.clone().is_null(),
    })
}

fn boolean_predicate(expr: &Expr, kind: BooleanAdvancedType) -> Expr {
    match kind {
        BooleanAdvancedType::True => expr.clone().eq(lit_bool(true)),
        BooleanAdvancedType::False => expr.clone().eq(lit_bool(false)),
        BooleanAdvancedType::Blank => expr.clone().is_null(),
        BooleanAdvancedType::NotBlank => expr.clone().is_not_null(),
    }
}

fn synchronize(target: &FilterTarget, value: Value, key: &str) -> QueryResult<(Expr, Value)> {
    let rejected = value.to_json();
    sync::synchronize(target.expr.clone(), target.ty, value).map_err(|e| {
        QueryError::InvalidRequest(vec![
            ValidationError::new(target.field(key), e.to_string()).with_rejected(rejected)
        ])
    })
}

fn option_not_allowed(target: &FilterTarget, kind: SimpleFilterType) -> QueryError {
    QueryError::InvalidRequest(vec![ValidationError::new(
        target.field("type"),
        format!("filter option '{}' is not allowed for this column", kind),
    )
    .with_rejected(serde_json::Value::String(kind.to_string()))])
}
