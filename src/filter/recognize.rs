//! Recognition of untyped `filterModel` payloads into filter models.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use tracing::{trace, warn};

use super::advanced::{
    AdvancedCondition, AdvancedFilter, BooleanAdvancedType, ScalarAdvancedType, TextAdvancedType,
};
use super::simple::{
    DateFilterModel, NumberFilterModel, SetFilterModel, SimpleFilter, SimpleFilterType,
    TextFilterModel,
};
use super::{FilterModel, JoinOperator};
use crate::error::{QueryError, QueryResult, ValidationError, Violations};
use crate::sync;

pub type JsonMap = serde_json::Map<String, Json>;

/// Custom recognizer for a column-keyed payload. Receives the column id and
/// the payload; returns `None` to decline.
pub type SimpleRecognizer = Arc<dyn Fn(&str, &JsonMap) -> Option<SimpleFilter> + Send + Sync>;

/// Custom recognizer for an advanced filter node.
pub type AdvancedRecognizer = Arc<dyn Fn(&JsonMap) -> Option<AdvancedFilter> + Send + Sync>;

const DATE_FILTER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ADVANCED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Turns JSON filter payloads into [`FilterModel`]s.
///
/// Built-in recognition runs first. Custom recognizers are consulted in
/// registration order only when the built-in one fails; if they all decline,
/// the built-in error is returned.
#[derive(Clone, Default)]
pub struct FilterRecognizer {
    simple: Vec<SimpleRecognizer>,
    advanced: Vec<AdvancedRecognizer>,
}

impl fmt::Debug for FilterRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRecognizer")
            .field("simple", &self.simple.len())
            .field("advanced", &self.advanced.len())
            .finish()
    }
}

impl FilterRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simple(
        mut self,
        recognizer: impl Fn(&str, &JsonMap) -> Option<SimpleFilter> + Send + Sync + 'static,
    ) -> Self {
        self.simple.push(Arc::new(recognizer));
        self
    }

    pub fn with_advanced(
        mut self,
        recognizer: impl Fn(&JsonMap) -> Option<AdvancedFilter> + Send + Sync + 'static,
    ) -> Self {
        self.advanced.push(Arc::new(recognizer));
        self
    }

    /// A payload is column-keyed iff every value in it is a map.
    pub fn is_column_keyed(payload: &JsonMap) -> bool {
        payload.values().all(Json::is_object)
    }

    /// Recognize a whole `filterModel`.
    ///
    /// Validation failures of every column are reported together;
    /// unrecognized constructs fail immediately.
    pub fn recognize(&self, payload: &Json) -> QueryResult<FilterModel> {
        let map = payload
            .as_object()
            .ok_or_else(|| QueryError::unrecognized("filter model", payload))?;

        if Self::is_column_keyed(map) {
            let mut entries = Vec::with_capacity(map.len());
            let mut violations = Violations::new();
            for (col_id, value) in map {
                if let Some(filter) = value.as_object() {
                    if let Some(filter) = violations.take(self.recognize_simple(col_id, filter))? {
                        entries.push((col_id.clone(), filter));
                    }
                }
            }
            trace!(columns = entries.len(), "recognized column filter model");
            violations.finish(FilterModel::Columns(entries))
        } else {
            let filter = self.recognize_advanced(map)?;
            trace!("recognized advanced filter model");
            Ok(FilterModel::Advanced(filter))
        }
    }

    pub fn recognize_simple(&self, col_id: &str, payload: &JsonMap) -> QueryResult<SimpleFilter> {
        match self.builtin_simple(col_id, payload) {
            Ok(filter) => {
                trace!(col_id, filter_type = filter.filter_type(), "built-in recognizer matched");
                Ok(filter)
            }
            Err(err) => {
                for recognizer in &self.simple {
                    if let Some(filter) = recognizer(col_id, payload) {
                        trace!(col_id, "custom recognizer matched");
                        return Ok(filter);
                    }
                }
                if !self.simple.is_empty() {
                    warn!(col_id, "custom filter recognizers declined payload");
                }
                Err(err)
            }
        }
    }

    pub fn recognize_advanced(&self, payload: &JsonMap) -> QueryResult<AdvancedFilter> {
        match self.builtin_advanced(payload) {
            Ok(filter) => Ok(filter),
            Err(err) => {
                for recognizer in &self.advanced {
                    if let Some(filter) = recognizer(payload) {
                        trace!("custom advanced recognizer matched");
                        return Ok(filter);
                    }
                }
                if !self.advanced.is_empty() {
                    warn!("custom advanced filter recognizers declined payload");
                }
                Err(err)
            }
        }
    }

    fn builtin_simple(&self, col_id: &str, payload: &JsonMap) -> QueryResult<SimpleFilter> {
        let path = format!("filterModel.{}", col_id);
        let filter_type = required_str(payload, "filterType", &path)?;

        if payload.contains_key("conditions") && payload.contains_key("operator") {
            return combined(filter_type, payload, &path);
        }

        match filter_type {
            "text" | "number" | "date" => scalar(filter_type, payload, &path),
            "set" => {
                let values = match payload.get("values") {
                    Some(Json::Array(items)) => items.iter().map(json_text).collect(),
                    Some(Json::Null) | None => Vec::new(),
                    Some(other) => {
                        return Err(invalid(&path, "values", "must be an array", other));
                    }
                };
                Ok(SimpleFilter::Set(SetFilterModel { values }))
            }
            "multi" => {
                let models = match payload.get("filterModels") {
                    Some(Json::Array(items)) => items,
                    Some(Json::Null) | None => return Ok(SimpleFilter::Multi(Vec::new())),
                    Some(other) => {
                        return Err(invalid(&path, "filterModels", "must be an array", other));
                    }
                };
                let mut children = Vec::with_capacity(models.len());
                let mut violations = Violations::new();
                for model in models {
                    match model {
                        Json::Object(child) => {
                            if let Some(filter) =
                                violations.take(self.recognize_simple(col_id, child))?
                            {
                                children.push(Some(filter));
                            }
                        }
                        Json::Null => children.push(None),
                        other => {
                            return Err(invalid(&path, "filterModels", "must hold objects", other))
                        }
                    }
                }
                violations.finish(SimpleFilter::Multi(children))
            }
            other => Err(QueryError::unrecognized("filter type", other)),
        }
    }

    fn builtin_advanced(&self, payload: &JsonMap) -> QueryResult<AdvancedFilter> {
        let filter_type = required_str(payload, "filterType", "filterModel")?;

        if filter_type == "join" {
            let operator = parse_enum::<JoinOperator>(
                required_str(payload, "type", "filterModel")?,
                "join operator",
            )?;
            let conditions = match payload.get("conditions") {
                Some(Json::Array(items)) => items,
                Some(Json::Null) | None => {
                    return Ok(AdvancedFilter::Join {
                        operator,
                        conditions: Vec::new(),
                    })
                }
                Some(other) => {
                    return Err(invalid("filterModel", "conditions", "must be an array", other))
                }
            };
            let mut children = Vec::with_capacity(conditions.len());
            let mut violations = Violations::new();
            for condition in conditions {
                let map = condition
                    .as_object()
                    .ok_or_else(|| QueryError::unrecognized("advanced filter", condition))?;
                if let Some(child) = violations.take(self.recognize_advanced(map))? {
                    children.push(child);
                }
            }
            return violations.finish(AdvancedFilter::Join {
                operator,
                conditions: children,
            });
        }

        let col_id = required_str(payload, "colId", "filterModel")?.to_string();
        let path = format!("filterModel.{}", col_id);
        let kind = required_str(payload, "type", &path)?;
        let filter = payload.get("filter").unwrap_or(&Json::Null);

        let condition = match filter_type {
            "text" => AdvancedCondition::Text {
                kind: parse_enum::<TextAdvancedType>(kind, "text filter type")?,
                filter: json_text(filter),
            },
            "object" => AdvancedCondition::Object {
                kind: parse_enum::<TextAdvancedType>(kind, "object filter type")?,
                filter: json_text(filter),
            },
            "number" => AdvancedCondition::Number {
                kind: parse_enum::<ScalarAdvancedType>(kind, "number filter type")?,
                filter: decimal_literal(filter, &path, "filter")?,
            },
            "date" => AdvancedCondition::Date {
                kind: parse_enum::<ScalarAdvancedType>(kind, "date filter type")?,
                filter: advanced_date_literal(filter, &path)?,
            },
            "dateString" => AdvancedCondition::DateString {
                kind: parse_enum::<ScalarAdvancedType>(kind, "dateString filter type")?,
                filter: advanced_date_literal(filter, &path)?,
            },
            "boolean" => AdvancedCondition::Boolean {
                kind: parse_enum::<BooleanAdvancedType>(kind, "boolean filter type")?,
            },
            other => return Err(QueryError::unrecognized("advanced filter type", other)),
        };

        Ok(AdvancedFilter::Column { col_id, condition })
    }
}

fn combined(filter_type: &str, payload: &JsonMap, path: &str) -> QueryResult<SimpleFilter> {
    if !matches!(filter_type, "text" | "number" | "date") {
        return Err(QueryError::unrecognized("combined filter type", filter_type));
    }
    let operator = parse_enum::<JoinOperator>(required_str(payload, "operator", path)?, "operator")?;
    let items = match payload.get("conditions") {
        Some(Json::Array(items)) => items,
        Some(other) => return Err(invalid(path, "conditions", "must be an array", other)),
        None => return Err(QueryError::invalid(format!("{}.conditions", path), "is required")),
    };

    let mut conditions = Vec::with_capacity(items.len());
    let mut violations = Violations::new();
    for (i, item) in items.iter().enumerate() {
        let map = item
            .as_object()
            .ok_or_else(|| invalid(path, "conditions", "must hold objects", item))?;
        // Conditions inherit the parent's family.
        let child_type = map
            .get("filterType")
            .and_then(Json::as_str)
            .unwrap_or(filter_type);
        if child_type != filter_type {
            return Err(QueryError::unrecognized(
                "combined condition type",
                format!("{} inside {}", child_type, filter_type),
            ));
        }
        let condition = scalar(filter_type, map, &format!("{}.conditions[{}]", path, i));
        if let Some(condition) = violations.take(condition)? {
            conditions.push(condition);
        }
    }

    violations.finish(SimpleFilter::Combined {
        operator,
        conditions,
    })
}

fn scalar(filter_type: &str, payload: &JsonMap, path: &str) -> QueryResult<SimpleFilter> {
    let kind = parse_enum::<SimpleFilterType>(
        required_str(payload, "type", path)?,
        &format!("{} filter type", filter_type),
    )?;
    let field = |name: &str| payload.get(name).unwrap_or(&Json::Null);
    // Both bounds are checked before failing.
    let mut violations = Violations::new();

    match filter_type {
        "text" => Ok(SimpleFilter::Text(TextFilterModel {
            kind,
            filter: json_text(field("filter")),
            filter_to: json_text(field("filterTo")),
        })),
        "number" => {
            let filter = violations.take(decimal_literal(field("filter"), path, "filter"))?;
            let filter_to = violations.take(decimal_literal(field("filterTo"), path, "filterTo"))?;
            violations.finish(SimpleFilter::Number(NumberFilterModel {
                kind,
                filter: filter.flatten(),
                filter_to: filter_to.flatten(),
            }))
        }
        "date" => {
            let date_from = violations.take(date_time_literal(field("dateFrom"), path, "dateFrom"))?;
            let date_to = violations.take(date_time_literal(field("dateTo"), path, "dateTo"))?;
            violations.finish(SimpleFilter::Date(DateFilterModel {
                kind,
                date_from: date_from.flatten(),
                date_to: date_to.flatten(),
            }))
        }
        other => Err(QueryError::unrecognized("filter type", other)),
    }
}

fn required_str<'a>(payload: &'a JsonMap, key: &str, path: &str) -> QueryResult<&'a str> {
    match payload.get(key) {
        Some(Json::String(s)) => Ok(s),
        Some(other) => Err(invalid(path, key, "must be a string", other)),
        None => Err(QueryError::invalid(format!("{}.{}", path, key), "is required")),
    }
}

fn parse_enum<T: FromStr>(s: &str, construct: &str) -> QueryResult<T> {
    s.parse::<T>()
        .map_err(|_| QueryError::unrecognized(construct, s))
}

/// Textual form of a JSON literal; `null` and absent become `None`.
fn json_text(value: &Json) -> Option<String> {
    match value {
        Json::Null => None,
        Json::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn decimal_literal(value: &Json, path: &str, key: &str) -> QueryResult<Option<Decimal>> {
    match json_text(value) {
        None => Ok(None),
        Some(text) => sync::parse_decimal(&text)
            .map(Some)
            .map_err(|e| invalid(path, key, &e.to_string(), value)),
    }
}

fn date_time_literal(value: &Json, path: &str, key: &str) -> QueryResult<Option<NaiveDateTime>> {
    match json_text(value) {
        None => Ok(None),
        Some(text) => NaiveDateTime::parse_from_str(&text, DATE_FILTER_FORMAT)
            .or_else(|_| sync::parse_date_time(&text))
            .map(Some)
            .map_err(|e| invalid(path, key, &e.to_string(), value)),
    }
}

fn advanced_date_literal(value: &Json, path: &str) -> QueryResult<Option<NaiveDate>> {
    match json_text(value) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(&text, ADVANCED_DATE_FORMAT)
            .or_else(|_| sync::parse_date_time(&text).map(|dt| dt.date()))
            .map(Some)
            .map_err(|e| invalid(path, "filter", &e.to_string(), value)),
    }
}

fn invalid(path: &str, key: &str, message: &str, rejected: &Json) -> QueryError {
    QueryError::InvalidRequest(vec![ValidationError::new(
        format!("{}.{}", path, key),
        message,
    )
    .with_rejected(rejected.clone())])
}
