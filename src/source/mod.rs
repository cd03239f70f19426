//! Data source collaborator.
//!
//! The query builder never touches storage directly. It hands compiled
//! queries to a [`DataSource`] and asks it for distinct values and field
//! types.

mod eval;
mod memory;

pub use memory::{DataFile, MemoryDataSource};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;

use crate::filter::FieldTypes;
use crate::model::{ScalarType, Value};
use crate::sql::Query;

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Unsupported expression: {0}")]
    Unsupported(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Failed to read data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rows returned by a query, keyed by the select list's output names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of the named column in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// Rows as `(column, value)` pairs.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }
}

/// Executes compiled queries.
///
/// `execute` and `distinct_values` are the only suspension points of a
/// request.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn execute(&self, query: &Query) -> Result<ResultSet, DataSourceError>;

    /// Distinct values of a field, sorted ascending.
    async fn distinct_values(&self, field: &str) -> Result<Vec<Value>, DataSourceError>;

    fn field_type(&self, field: &str) -> ScalarType;

    /// Run a query whose first cell is a count.
    async fn count(&self, query: &Query) -> Result<u64, DataSourceError> {
        let result = self.execute(query).await?;
        let cell = result
            .rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| DataSourceError::Evaluation("count query returned no rows".into()))?;
        cell.as_decimal()
            .and_then(|d| d.to_u64())
            .ok_or_else(|| DataSourceError::Evaluation(format!("count is not a number: {}", cell)))
    }
}

/// Exposes a data source's type registry to the predicate compiler.
pub struct SourceTypes<'a>(pub &'a dyn DataSource);

impl FieldTypes for SourceTypes<'_> {
    fn field_type(&self, field: &str) -> ScalarType {
        self.0.field_type(field)
    }
}
