//! Server-side row model request.

use serde::{Deserialize, Serialize};

/// A column as referenced by the grid in row-group, value and pivot lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnVO {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub field: String,
    /// Only meaningful when the column is used as a value column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agg_func: Option<String>,
}

impl ColumnVO {
    pub fn new(field: &str) -> Self {
        Self {
            id: field.into(),
            display_name: field.into(),
            field: field.into(),
            agg_func: None,
        }
    }

    pub fn with_agg_func(mut self, agg_func: &str) -> Self {
        self.agg_func = Some(agg_func.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortModelItem {
    pub col_id: String,
    pub sort: SortDirection,
}

impl SortModelItem {
    pub fn asc(col_id: &str) -> Self {
        Self {
            col_id: col_id.into(),
            sort: SortDirection::Asc,
        }
    }

    pub fn desc(col_id: &str) -> Self {
        Self {
            col_id: col_id.into(),
            sort: SortDirection::Desc,
        }
    }
}

/// One block request from the grid.
///
/// `startRow..endRow` is a half-open window. `groupKeys` holds one key per
/// expanded row-group level; keys are usually strings but may be `null` for
/// the empty group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSideGetRowsRequest {
    pub start_row: u64,
    pub end_row: u64,
    pub row_group_cols: Vec<ColumnVO>,
    pub value_cols: Vec<ColumnVO>,
    pub pivot_cols: Vec<ColumnVO>,
    pub pivot_mode: bool,
    pub group_keys: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_model: Option<serde_json::Value>,
    pub sort_model: Vec<SortModelItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_filter: Option<serde_json::Value>,
}

impl ServerSideGetRowsRequest {
    /// More row-group levels than expanded keys.
    pub fn is_grouping(&self) -> bool {
        self.row_group_cols.len() > self.group_keys.len()
    }

    pub fn is_pivoting(&self) -> bool {
        self.pivot_mode && !self.pivot_cols.is_empty()
    }

    /// Row-group columns selected at the current level: every expanded level
    /// plus the next one.
    pub fn active_group_cols(&self) -> &[ColumnVO] {
        let depth = (self.group_keys.len() + 1).min(self.row_group_cols.len());
        &self.row_group_cols[..depth]
    }

    /// Page size requested by the window.
    pub fn page_size(&self) -> u64 {
        self.end_row.saturating_sub(self.start_row)
    }

    pub fn has_filter_model(&self) -> bool {
        match &self.filter_model {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }
}
