//! Integration tests for row grouping and aggregation.
//!
//! Requests run end to end against the in-memory data source so both the
//! compiled SQL and the computed groups are checked.

use std::sync::Arc;

use gridquery::config::Settings;
use gridquery::model::{ColumnVO, ScalarType, ServerSideGetRowsRequest, SortModelItem, Value};
use gridquery::source::MemoryDataSource;
use gridquery::sql::{self, Dialect, ExprExt};
use gridquery::{QueryBuilder, QueryError};
use serde_json::json;

fn sales() -> MemoryDataSource {
    MemoryDataSource::new(
        "sales",
        &[
            ("country", ScalarType::Text),
            ("city", ScalarType::Text),
            ("amount", ScalarType::Integer),
        ],
    )
    .with_rows(vec![
        vec!["US".into(), "Boston".into(), Value::Int(10)],
        vec!["US".into(), "Austin".into(), Value::Int(5)],
        vec!["FR".into(), "Paris".into(), Value::Int(7)],
    ])
    .unwrap()
}

fn builder() -> QueryBuilder {
    QueryBuilder::builder(Arc::new(sales()))
        .table("sales")
        .build()
        .unwrap()
}

fn by_country(start_row: u64, end_row: u64) -> ServerSideGetRowsRequest {
    ServerSideGetRowsRequest {
        start_row,
        end_row,
        row_group_cols: vec![ColumnVO::new("country")],
        value_cols: vec![ColumnVO::new("amount").with_agg_func("sum")],
        ..Default::default()
    }
}

// ============================================================================
// Group Rows
// ============================================================================

#[tokio::test]
async fn test_group_rows_sum_per_country() {
    let response = builder().get_rows(&by_country(0, 100)).await.unwrap();

    assert_eq!(response.row_data.len(), 2);
    assert_eq!(response.row_data[0]["country"], json!("US"));
    assert_eq!(response.row_data[0]["amount"], json!(15));
    assert_eq!(response.row_data[1]["country"], json!("FR"));
    assert_eq!(response.row_data[1]["amount"], json!(7));
    assert_eq!(response.row_count, Some(2));
}

#[tokio::test]
async fn test_window_returns_first_group_only() {
    let response = builder().get_rows(&by_country(0, 1)).await.unwrap();

    assert_eq!(response.row_data.len(), 1);
    assert_eq!(response.row_data[0]["amount"], json!(15));
    // A full page does not reveal the total.
    assert_eq!(response.row_count, None);
}

#[tokio::test]
async fn test_group_by_count_follows_expanded_levels() {
    let b = builder();
    let mut request = ServerSideGetRowsRequest {
        row_group_cols: vec![ColumnVO::new("country"), ColumnVO::new("city")],
        value_cols: vec![ColumnVO::new("amount").with_agg_func("sum")],
        end_row: 100,
        ..Default::default()
    };

    let (query, _) = b.build_query(&request).await.unwrap();
    assert_eq!(query.group_by.len(), 1);

    request.group_keys = vec![json!("US")];
    let (query, _) = b.build_query(&request).await.unwrap();
    assert_eq!(query.group_by.len(), 2);
    let sql = query.to_sql(Dialect::Postgres);
    assert!(sql.contains("WHERE \"country\" = 'US'"), "{}", sql);

    let response = b.get_rows(&request).await.unwrap();
    assert_eq!(response.row_data.len(), 2);
    assert!(response
        .row_data
        .iter()
        .all(|row| row["country"] == json!("US")));
}

#[tokio::test]
async fn test_fully_expanded_returns_leaf_rows() {
    let request = ServerSideGetRowsRequest {
        row_group_cols: vec![ColumnVO::new("country")],
        value_cols: vec![ColumnVO::new("amount").with_agg_func("sum")],
        group_keys: vec![json!("US")],
        end_row: 100,
        ..Default::default()
    };
    let (query, _) = builder().build_query(&request).await.unwrap();
    assert!(query.group_by.is_empty());

    let response = builder().get_rows(&request).await.unwrap();
    assert_eq!(response.row_data.len(), 2);
    assert_eq!(response.row_data[0]["city"], json!("Boston"));
    assert_eq!(response.row_data[0]["amount"], json!(10));
}

#[tokio::test]
async fn test_null_group_key_selects_empty_group() {
    let source = sales()
        .with_rows(vec![vec![Value::Null, "Nowhere".into(), Value::Int(3)]])
        .unwrap();
    let b = QueryBuilder::builder(Arc::new(source))
        .table("sales")
        .build()
        .unwrap();
    let request = ServerSideGetRowsRequest {
        row_group_cols: vec![ColumnVO::new("country")],
        group_keys: vec![json!(null)],
        end_row: 100,
        ..Default::default()
    };
    let response = b.get_rows(&request).await.unwrap();
    assert_eq!(response.row_data.len(), 1);
    assert_eq!(response.row_data[0]["city"], json!("Nowhere"));
}

// ============================================================================
// Aggregates
// ============================================================================

#[tokio::test]
async fn test_builtin_aggregates() {
    let request = ServerSideGetRowsRequest {
        row_group_cols: vec![ColumnVO::new("country")],
        value_cols: vec![
            ColumnVO::new("amount").with_agg_func("max"),
        ],
        sort_model: vec![SortModelItem::asc("country")],
        end_row: 100,
        ..Default::default()
    };
    let response = builder().get_rows(&request).await.unwrap();
    assert_eq!(response.row_data[0]["country"], json!("FR"));
    assert_eq!(response.row_data[1]["amount"], json!(10));
}

#[tokio::test]
async fn test_registered_aggregate() {
    let b = QueryBuilder::builder(Arc::new(sales()))
        .table("sales")
        .register_aggregate("spread", |e| sql::max(e.clone()).sub(sql::min(e)))
        .build()
        .unwrap();
    let mut request = by_country(0, 100);
    request.value_cols = vec![ColumnVO::new("amount").with_agg_func("spread")];

    let response = b.get_rows(&request).await.unwrap();
    assert_eq!(response.row_data[0]["amount"], json!(5));
    assert_eq!(response.row_data[1]["amount"], json!(0));
}

#[tokio::test]
async fn test_unknown_aggregate_is_unrecognized() {
    let mut request = by_country(0, 100);
    request.value_cols = vec![ColumnVO::new("amount").with_agg_func("median")];
    // Other problems in the request do not turn it into a validation error.
    request.end_row = 0;
    request.start_row = 10;

    let err = builder().get_rows(&request).await.unwrap_err();
    let QueryError::Unrecognized { construct, value } = &err else {
        panic!("expected unrecognized aggregate, got {:?}", err);
    };
    assert_eq!(construct, "aggregate function");
    assert_eq!(value, "median");
    assert_eq!(err.to_string(), "Unrecognized aggregate function: median");
}

#[tokio::test]
async fn test_child_count() {
    let mut settings = Settings::default();
    settings.grid.get_child_count = true;
    let b = QueryBuilder::builder(Arc::new(sales()))
        .table("sales")
        .settings(settings)
        .build()
        .unwrap();

    let response = b.get_rows(&by_country(0, 100)).await.unwrap();
    assert_eq!(response.row_data[0]["childCount"], json!(2));
    assert_eq!(response.row_data[1]["childCount"], json!(1));
}
