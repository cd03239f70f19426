//! Integration tests for pivot column generation.

use std::sync::Arc;

use gridquery::config::Settings;
use gridquery::model::{ColumnVO, ScalarType, ServerSideGetRowsRequest, SortModelItem, Value};
use gridquery::source::MemoryDataSource;
use gridquery::sql::Dialect;
use gridquery::{QueryBuilder, QueryError};
use serde_json::json;

fn sales() -> MemoryDataSource {
    MemoryDataSource::new(
        "sales",
        &[
            ("Country", ScalarType::Text),
            ("Year", ScalarType::Integer),
            ("Amount", ScalarType::Integer),
        ],
    )
    .with_rows(vec![
        vec!["US".into(), Value::Int(2023), Value::Int(10)],
        vec!["US".into(), Value::Int(2024), Value::Int(5)],
        vec!["FR".into(), Value::Int(2023), Value::Int(7)],
        vec!["FR".into(), Value::Int(2024), Value::Int(20)],
    ])
    .unwrap()
}

fn builder_with(settings: Settings) -> QueryBuilder {
    QueryBuilder::builder(Arc::new(sales()))
        .table("sales")
        .settings(settings)
        .build()
        .unwrap()
}

fn pivot_request() -> ServerSideGetRowsRequest {
    ServerSideGetRowsRequest {
        end_row: 100,
        pivot_mode: true,
        row_group_cols: vec![ColumnVO::new("Country")],
        pivot_cols: vec![ColumnVO::new("Year")],
        value_cols: vec![ColumnVO::new("Amount").with_agg_func("sum")],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_pivot_result_fields_follow_value_order() {
    let response = builder_with(Settings::default())
        .get_rows(&pivot_request())
        .await
        .unwrap();

    assert_eq!(
        response.pivot_result_fields,
        Some(vec!["2023_Amount".to_string(), "2024_Amount".to_string()])
    );
    let us = &response.row_data[0];
    assert_eq!(us["Country"], json!("US"));
    assert_eq!(us["2023_Amount"], json!(10));
    assert_eq!(us["2024_Amount"], json!(5));
    // Plain value columns are replaced by the generated ones.
    assert!(!us.contains_key("Amount"));
}

#[tokio::test]
async fn test_pivot_select_uses_nested_case() {
    let mut request = pivot_request();
    request.pivot_cols.push(ColumnVO::new("Country"));
    request.row_group_cols.clear();

    let (query, pivot) = builder_with(Settings::default())
        .build_query(&request)
        .await
        .unwrap();
    assert_eq!(pivot.columns.len(), 4);
    assert_eq!(pivot.result_fields()[0], "2023_FR_Amount");

    let sql = query.to_sql(Dialect::DuckDb);
    assert!(
        sql.contains(
            "SUM(CASE WHEN \"Year\" = 2023 THEN CASE WHEN \"Country\" = 'FR' THEN \"Amount\" END END) AS \"2023_FR_Amount\""
        ),
        "{}",
        sql
    );
    assert!(query.group_by.is_empty());
}

#[tokio::test]
async fn test_pivot_ceiling() {
    let mut settings = Settings::default();
    settings.pivot.max_generated_columns = Some(1);

    let err = builder_with(settings)
        .get_rows(&pivot_request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::PivotMaxColumnsExceeded { limit: 1, actual: 2 }
    ));
    assert_eq!(
        err.to_string(),
        "Pivot max columns exceeded, limit: 1, actual columns: 2"
    );
}

#[tokio::test]
async fn test_custom_separator() {
    let mut settings = Settings::default();
    settings.pivot.separator = "|".into();

    let response = builder_with(settings)
        .get_rows(&pivot_request())
        .await
        .unwrap();
    assert_eq!(
        response.pivot_result_fields.unwrap(),
        vec!["2023|Amount", "2024|Amount"]
    );
}

#[tokio::test]
async fn test_filter_on_pivot_column_goes_to_having() {
    let mut request = pivot_request();
    request.filter_model = Some(json!({
        "2023_Amount": {"filterType": "number", "type": "greaterThan", "filter": 8}
    }));

    let b = builder_with(Settings::default());
    let (query, _) = b.build_query(&request).await.unwrap();
    assert!(query.where_clause.is_none());
    assert!(query.having.is_some());

    let response = b.get_rows(&request).await.unwrap();
    assert_eq!(response.row_data.len(), 1);
    assert_eq!(response.row_data[0]["Country"], json!("US"));
}

#[tokio::test]
async fn test_sort_on_pivot_column() {
    let mut request = pivot_request();
    request.sort_model = vec![SortModelItem::desc("2024_Amount")];

    let response = builder_with(Settings::default())
        .get_rows(&request)
        .await
        .unwrap();
    assert_eq!(response.row_data[0]["Country"], json!("FR"));
    assert_eq!(response.row_data[0]["2024_Amount"], json!(20));
}

#[tokio::test]
async fn test_pivot_mode_without_pivot_columns_groups_normally() {
    let mut request = pivot_request();
    request.pivot_cols.clear();

    let response = builder_with(Settings::default())
        .get_rows(&request)
        .await
        .unwrap();
    assert_eq!(response.pivot_result_fields, None);
    assert_eq!(response.row_data[1]["Amount"], json!(27));
}

#[tokio::test]
async fn test_pivot_without_value_columns_returns_leaf_rows() {
    let mut request = pivot_request();
    request.row_group_cols.clear();
    request.value_cols.clear();

    let response = builder_with(Settings::default())
        .get_rows(&request)
        .await
        .unwrap();
    assert_eq!(response.pivot_result_fields, Some(vec![]));
    assert_eq!(response.row_data.len(), 4);
    assert_eq!(response.row_data[3]["Amount"], json!(20));
}
