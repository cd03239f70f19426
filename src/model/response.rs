//! Response handed back to the grid.

use serde::{Deserialize, Serialize};

/// One block of rows for the server-side row model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSuccessParams {
    pub row_data: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Total row count, known once the last block has been served.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_level_info: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_result_fields: Option<Vec<String>>,
}
