//! End-to-end tests for fetching row blocks.

use std::sync::Arc;

use gridquery::config::Settings;
use gridquery::filter::ColumnFilter;
use gridquery::model::{ColumnDef, ColumnVO, ScalarType, ServerSideGetRowsRequest, Value};
use gridquery::source::MemoryDataSource;
use gridquery::sql::Dialect;
use gridquery::{QueryBuilder, QueryError};
use serde_json::json;

const CUSTOMERS: &str = r#"{
    "table": "customers",
    "columns": [
        {"name": "id", "type": "integer"},
        {"name": "name", "type": "text"},
        {"name": "address.city", "type": "text"},
        {"name": "balance", "type": "decimal"}
    ],
    "rows": [
        {"id": 1, "name": "Ada", "address.city": "London", "balance": "12.50"},
        {"id": 2, "name": "Grace", "address.city": "Arlington", "balance": 3},
        {"id": 3, "name": "Linus", "address.city": "Helsinki", "balance": null},
        {"id": 4, "name": "Ken", "address.city": "London"}
    ]
}"#;

fn customers() -> MemoryDataSource {
    MemoryDataSource::from_json_str(CUSTOMERS).unwrap()
}

fn builder_with(settings: Settings) -> QueryBuilder {
    QueryBuilder::builder(Arc::new(customers()))
        .table("customers")
        .settings(settings)
        .build()
        .unwrap()
}

fn window(start_row: u64, end_row: u64) -> ServerSideGetRowsRequest {
    ServerSideGetRowsRequest {
        start_row,
        end_row,
        ..Default::default()
    }
}

#[test]
fn test_data_file_loads_typed_rows() {
    let source = customers();
    assert_eq!(source.table(), "customers");
    assert_eq!(source.len(), 4);
    assert_eq!(source.columns()[3], ("balance".to_string(), ScalarType::Decimal));
}

#[tokio::test]
async fn test_dotted_fields_are_nested() {
    let response = builder_with(Settings::default())
        .get_rows(&window(0, 1))
        .await
        .unwrap();
    let row = &response.row_data[0];
    assert_eq!(row["address"], json!({"city": "London"}));
    assert_eq!(row["balance"], json!(12.5));
    assert!(!row.contains_key("address.city"));
}

#[tokio::test]
async fn test_dot_notation_can_be_suppressed() {
    let mut settings = Settings::default();
    settings.grid.suppress_field_dot_notation = true;
    let response = builder_with(settings).get_rows(&window(0, 1)).await.unwrap();
    assert_eq!(response.row_data[0]["address.city"], json!("London"));
}

#[tokio::test]
async fn test_row_count_known_on_last_page() {
    let b = builder_with(Settings::default());

    let first = b.get_rows(&window(0, 3)).await.unwrap();
    assert_eq!(first.row_data.len(), 3);
    assert_eq!(first.row_count, None);

    let last = b.get_rows(&window(3, 6)).await.unwrap();
    assert_eq!(last.row_data.len(), 1);
    assert_eq!(last.row_data[0]["name"], json!("Ken"));
    assert_eq!(last.row_count, Some(4));
}

#[tokio::test]
async fn test_column_defs_limit_projection() {
    let b = QueryBuilder::builder(Arc::new(customers()))
        .table("customers")
        .column_defs(vec![
            ColumnDef::new("id"),
            ColumnDef::new("name").filter(ColumnFilter::text()),
        ])
        .build()
        .unwrap();
    let (query, _) = b.build_query(&window(0, 10)).await.unwrap();
    let sql = query.to_sql(Dialect::Postgres);
    assert!(sql.contains("\"id\",\n  \"name\"\nFROM \"customers\""), "{}", sql);

    let response = b.get_rows(&window(0, 10)).await.unwrap();
    let keys: Vec<_> = response.row_data[0].keys().cloned().collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&"id".to_string()));
    assert!(keys.contains(&"name".to_string()));
}

#[tokio::test]
async fn test_set_filter_values_are_sorted_and_distinct() {
    let b = builder_with(Settings::default());
    let values = b.supply_set_filter_values("address.city").await.unwrap();
    assert_eq!(
        values,
        vec![
            Value::from("Arlington"),
            Value::from("Helsinki"),
            Value::from("London"),
        ]
    );
}

#[tokio::test]
async fn test_set_filter_values_respect_column_defs() {
    let b = QueryBuilder::builder(Arc::new(customers()))
        .table("customers")
        .column_defs(vec![
            ColumnDef::new("id"),
            ColumnDef::new("name").filter(ColumnFilter::text()),
        ])
        .build()
        .unwrap();

    let err = b.supply_set_filter_values("id").await.unwrap_err();
    let QueryError::InvalidRequest(errors) = err else {
        panic!("expected validation error, got {:?}", err);
    };
    assert_eq!(errors[0].message, "filtering is disabled for this column");

    let err = b.supply_set_filter_values("balance").await.unwrap_err();
    assert!(err.to_string().contains("balance: unknown column"));

    assert_eq!(b.supply_set_filter_values("name").await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_dialect_rendering_of_same_request() {
    let mut settings = Settings::default();
    settings.dialect = Dialect::TSql;
    let b = builder_with(settings);
    let request = ServerSideGetRowsRequest {
        start_row: 20,
        end_row: 30,
        row_group_cols: vec![ColumnVO::new("address.city")],
        value_cols: vec![ColumnVO::new("balance").with_agg_func("avg")],
        ..Default::default()
    };
    let (query, _) = b.build_query(&request).await.unwrap();

    let tsql = query.to_sql(Dialect::TSql);
    assert!(tsql.contains("GROUP BY [address.city]"), "{}", tsql);
    assert!(tsql.contains("ORDER BY (SELECT NULL)"));
    assert!(tsql.contains("OFFSET 20 ROWS"));
    assert!(tsql.contains("FETCH NEXT 10 ROWS ONLY"));

    let mysql = query.to_sql(Dialect::MySql);
    assert!(mysql.contains("AVG(`balance`) AS `balance`"), "{}", mysql);
    assert!(mysql.contains("LIMIT 10 OFFSET 20"));
}

#[tokio::test]
async fn test_avg_ignores_nulls() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        row_group_cols: vec![ColumnVO::new("address.city")],
        value_cols: vec![ColumnVO::new("balance").with_agg_func("avg")],
        ..Default::default()
    };
    let response = builder_with(Settings::default())
        .get_rows(&request)
        .await
        .unwrap();
    let london = response
        .row_data
        .iter()
        .find(|r| r["address"]["city"] == json!("London"))
        .unwrap();
    assert_eq!(london["balance"], json!(12.5));
}

#[tokio::test]
async fn test_builder_shared_across_tasks() {
    let b = builder_with(Settings::default());
    let handles: Vec<_> = (0..4u64)
        .map(|i| {
            let b = b.clone();
            tokio::spawn(async move { b.get_rows(&window(i, i + 1)).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        ids.push(response.row_data[0]["id"].clone());
    }
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);
}
