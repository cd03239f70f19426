//! Integration tests for total row and group counts.

use std::sync::Arc;

use gridquery::config::Settings;
use gridquery::model::{ColumnVO, ScalarType, ServerSideGetRowsRequest, Value};
use gridquery::source::MemoryDataSource;
use gridquery::QueryBuilder;
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
        vec!["US".into(), "Boston".into(), Value::Int(1)],
        vec!["FR".into(), "Paris".into(), Value::Int(7)],
        vec!["DE".into(), "Berlin".into(), Value::Int(2)],
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

fn grouped(group_keys: Vec<serde_json::Value>) -> ServerSideGetRowsRequest {
    ServerSideGetRowsRequest {
        end_row: 100,
        row_group_cols: vec![ColumnVO::new("country"), ColumnVO::new("city")],
        value_cols: vec![ColumnVO::new("amount").with_agg_func("sum")],
        group_keys,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_flat_count_applies_filters_not_window() {
    let request = ServerSideGetRowsRequest {
        start_row: 1,
        end_row: 2,
        filter_model: Some(json!({"amount": {"filterType": "number", "type": "greaterThan", "filter": 4}})),
        ..Default::default()
    };
    let count = builder_with(Settings::default())
        .count_rows(&request)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_grouped_count_counts_root_groups() {
    let b = builder_with(Settings::default());
    assert_eq!(b.count_rows(&grouped(vec![])).await.unwrap(), 3);
    // Without child pagination the root level is always counted, even
    // once every group is expanded.
    assert_eq!(b.count_rows(&grouped(vec![json!("US")])).await.unwrap(), 1);
    assert_eq!(
        b.count_rows(&grouped(vec![json!("US"), json!("Boston")]))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_paginated_child_rows_count_next_level() {
    let mut settings = Settings::default();
    settings.grid.paginate_child_rows = true;
    let b = builder_with(settings);

    assert_eq!(b.count_rows(&grouped(vec![])).await.unwrap(), 3);
    assert_eq!(b.count_rows(&grouped(vec![json!("US")])).await.unwrap(), 2);
    // Fully expanded: leaf rows are counted.
    assert_eq!(
        b.count_rows(&grouped(vec![json!("US"), json!("Boston")]))
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_group_agg_filter_counts_surviving_groups() {
    let mut settings = Settings::default();
    settings.grid.group_agg_filtering = true;
    let b = builder_with(settings);

    let mut request = grouped(vec![]);
    request.row_group_cols.truncate(1);
    request.filter_model = Some(json!({
        "amount": {"filterType": "number", "type": "greaterThan", "filter": 6}
    }));

    assert_eq!(b.count_rows(&request).await.unwrap(), 2);
    let response = b.get_rows(&request).await.unwrap();
    assert_eq!(response.row_count, Some(2));
}

#[tokio::test]
async fn test_group_agg_filter_passes_on_leaf_or_aggregate() {
    let mut settings = Settings::default();
    settings.grid.group_agg_filtering = true;
    let b = builder_with(settings);
    let countries = |rows: &[serde_json::Map<String, serde_json::Value>]| {
        rows.iter().map(|r| r["country"].clone()).collect::<Vec<_>>()
    };

    // US totals 16 but holds a single small sale.
    let mut request = grouped(vec![]);
    request.row_group_cols.truncate(1);
    request.filter_model = Some(json!({
        "amount": {"filterType": "number", "type": "lessThan", "filter": 3}
    }));
    assert_eq!(b.count_rows(&request).await.unwrap(), 2);
    let response = b.get_rows(&request).await.unwrap();
    assert_eq!(countries(&response.row_data), vec![json!("US"), json!("DE")]);

    // No single US sale passes, its total does.
    request.filter_model = Some(json!({
        "amount": {"filterType": "number", "type": "greaterThan", "filter": 12}
    }));
    assert_eq!(b.count_rows(&request).await.unwrap(), 1);

    // A passing country keeps every city beneath it.
    let mut request = grouped(vec![json!("US")]);
    request.filter_model = Some(json!({
        "amount": {"filterType": "number", "type": "greaterThan", "filter": 12}
    }));
    let cities: Vec<_> = b
        .get_rows(&request)
        .await
        .unwrap()
        .row_data
        .iter()
        .map(|r| r["city"].clone())
        .collect();
    assert_eq!(cities, vec![json!("Boston"), json!("Austin")]);
}

#[tokio::test]
async fn test_count_rejects_invalid_request() {
    let request = ServerSideGetRowsRequest {
        start_row: 10,
        end_row: 5,
        ..Default::default()
    };
    let err = builder_with(Settings::default())
        .count_rows(&request)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("endRow: must not be less than startRow"));
}
