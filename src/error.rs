//! Error types for request compilation and execution.

use std::fmt;

use crate::config::SettingsError;
use crate::source::DataSourceError;

/// Result alias used across the crate.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while compiling or executing a grid request.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Unknown filter type, aggregate function or enum value.
    #[error("Unrecognized {construct}: {value}")]
    Unrecognized { construct: String, value: String },

    #[error("Pivot max columns exceeded, limit: {limit}, actual columns: {actual}")]
    PivotMaxColumnsExceeded { limit: usize, actual: usize },

    #[error("Request validation failed:{}", format_validation_errors(.0))]
    InvalidRequest(Vec<ValidationError>),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl QueryError {
    pub fn unrecognized(construct: impl Into<String>, value: impl fmt::Display) -> Self {
        QueryError::Unrecognized {
            construct: construct.into(),
            value: value.to_string(),
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        QueryError::InvalidRequest(vec![ValidationError::new(field, message)])
    }
}

/// One offending request field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub rejected_value: Option<serde_json::Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rejected_value: None,
        }
    }

    pub fn with_rejected(mut self, value: serde_json::Value) -> Self {
        self.rejected_value = Some(value);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collects validation failures so a request reports all of them at once.
/// Any other error stays fatal and passes straight through.
#[derive(Debug, Default)]
pub struct Violations(Vec<ValidationError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the value, or record the validation failures and yield `None`.
    pub fn take<T>(&mut self, result: QueryResult<T>) -> QueryResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(QueryError::InvalidRequest(errors)) => {
                self.0.extend(errors);
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `value` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> QueryResult<T> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(QueryError::InvalidRequest(self.0))
        }
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| format!("\n- {}", e)).collect()
}
