//! Integration tests for ORDER BY planning.

use std::sync::Arc;

use gridquery::model::{ColumnVO, ScalarType, ServerSideGetRowsRequest, SortModelItem, Value};
use gridquery::source::MemoryDataSource;
use gridquery::sql::Dialect;
use gridquery::QueryBuilder;
use serde_json::json;

fn builder() -> QueryBuilder {
    let source = MemoryDataSource::new(
        "orders",
        &[
            ("region", ScalarType::Text),
            ("product", ScalarType::Text),
            ("qty", ScalarType::Integer),
        ],
    )
    .with_rows(vec![
        vec!["EU".into(), "bolt".into(), Value::Int(3)],
        vec!["EU".into(), "nut".into(), Value::Int(9)],
        vec!["US".into(), "bolt".into(), Value::Int(4)],
        vec!["US".into(), Value::Null, Value::Int(1)],
        vec!["APAC".into(), "nut".into(), Value::Int(2)],
    ])
    .unwrap();
    QueryBuilder::builder(Arc::new(source))
        .table("orders")
        .build()
        .unwrap()
}

fn products(rows: &[serde_json::Map<String, serde_json::Value>]) -> Vec<serde_json::Value> {
    rows.iter().map(|r| r["product"].clone()).collect()
}

#[tokio::test]
async fn test_flat_sort_in_client_order() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        sort_model: vec![SortModelItem::asc("product"), SortModelItem::desc("qty")],
        ..Default::default()
    };
    let response = builder().get_rows(&request).await.unwrap();
    let qty: Vec<_> = response.row_data.iter().map(|r| r["qty"].clone()).collect();
    // NULL first ascending, then bolt (4, 3), then nut (9, 2).
    assert_eq!(qty, vec![json!(1), json!(4), json!(3), json!(9), json!(2)]);
}

#[tokio::test]
async fn test_descending_puts_nulls_last() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        sort_model: vec![SortModelItem::desc("product")],
        ..Default::default()
    };
    let response = builder().get_rows(&request).await.unwrap();
    let products = products(&response.row_data);
    assert_eq!(products.last(), Some(&json!(null)));
    assert_eq!(products[0], json!("nut"));
}

#[tokio::test]
async fn test_group_sort_uses_aggregate() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        row_group_cols: vec![ColumnVO::new("region")],
        value_cols: vec![ColumnVO::new("qty").with_agg_func("sum")],
        sort_model: vec![SortModelItem::desc("qty")],
        ..Default::default()
    };
    let b = builder();
    let (query, _) = b.build_query(&request).await.unwrap();
    assert!(query
        .to_sql(Dialect::Postgres)
        .contains("ORDER BY SUM(\"qty\") DESC"));

    let response = b.get_rows(&request).await.unwrap();
    let regions: Vec<_> = response.row_data.iter().map(|r| r["region"].clone()).collect();
    assert_eq!(regions, vec![json!("EU"), json!("US"), json!("APAC")]);
}

#[tokio::test]
async fn test_group_sort_ignores_auto_column_and_deeper_levels() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        row_group_cols: vec![ColumnVO::new("region"), ColumnVO::new("product")],
        sort_model: vec![
            SortModelItem::asc("ag-Grid-AutoColumn"),
            SortModelItem::asc("product"),
            SortModelItem::desc("region"),
        ],
        ..Default::default()
    };
    let (query, _) = builder().build_query(&request).await.unwrap();
    assert_eq!(query.order_by.len(), 1);
    assert!(query
        .to_sql(Dialect::Postgres)
        .contains("ORDER BY \"region\" DESC"));
}

#[tokio::test]
async fn test_window_applies_after_sort() {
    let request = ServerSideGetRowsRequest {
        start_row: 1,
        end_row: 3,
        sort_model: vec![SortModelItem::desc("qty")],
        ..Default::default()
    };
    let response = builder().get_rows(&request).await.unwrap();
    let qty: Vec<_> = response.row_data.iter().map(|r| r["qty"].clone()).collect();
    assert_eq!(qty, vec![json!(4), json!(3)]);
    assert_eq!(response.row_count, None);
}
