//! Integration tests for the advanced (boolean tree) filter model.

use std::sync::Arc;

use chrono::NaiveDate;
use gridquery::config::Settings;
use gridquery::filter::{AdvancedCondition, AdvancedFilter, TextAdvancedType};
use gridquery::model::{ScalarType, ServerSideGetRowsRequest, Value};
use gridquery::source::MemoryDataSource;
use gridquery::sql::Dialect;
use gridquery::{QueryBuilder, QueryError};
use serde_json::{json, Value as Json};

fn date(s: &str) -> Value {
    Value::Date(s.parse::<NaiveDate>().unwrap())
}

fn staff() -> MemoryDataSource {
    MemoryDataSource::new(
        "staff",
        &[
            ("name", ScalarType::Text),
            ("age", ScalarType::Integer),
            ("active", ScalarType::Boolean),
            ("hired", ScalarType::Date),
        ],
    )
    .with_rows(vec![
        vec!["Alice".into(), Value::Int(31), Value::Bool(true), date("2020-03-01")],
        vec!["Bob".into(), Value::Int(25), Value::Bool(false), date("2022-07-15")],
        vec!["Carla".into(), Value::Int(45), Value::Null, date("2018-01-10")],
    ])
    .unwrap()
}

fn builder() -> QueryBuilder {
    let mut settings = Settings::default();
    settings.grid.enable_advanced_filter = true;
    QueryBuilder::builder(Arc::new(staff()))
        .table("staff")
        .settings(settings)
        .build()
        .unwrap()
}

async fn names(b: &QueryBuilder, filter_model: Json) -> Vec<Json> {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(filter_model),
        ..Default::default()
    };
    b.get_rows(&request)
        .await
        .unwrap()
        .row_data
        .iter()
        .map(|r| r["name"].clone())
        .collect()
}

#[tokio::test]
async fn test_join_and() {
    let result = names(
        &builder(),
        json!({
            "filterType": "join",
            "type": "AND",
            "conditions": [
                {"filterType": "text", "colId": "name", "type": "contains", "filter": "a"},
                {"filterType": "number", "colId": "age", "type": "greaterThan", "filter": 30}
            ]
        }),
    )
    .await;
    assert_eq!(result, vec![json!("Alice"), json!("Carla")]);
}

#[tokio::test]
async fn test_nested_join_or() {
    let result = names(
        &builder(),
        json!({
            "filterType": "join",
            "type": "OR",
            "conditions": [
                {"filterType": "boolean", "colId": "active", "type": "false"},
                {
                    "filterType": "join",
                    "type": "AND",
                    "conditions": [
                        {"filterType": "boolean", "colId": "active", "type": "blank"},
                        {"filterType": "number", "colId": "age", "type": "lessThanOrEqual", "filter": 45}
                    ]
                }
            ]
        }),
    )
    .await;
    assert_eq!(result, vec![json!("Bob"), json!("Carla")]);
}

#[tokio::test]
async fn test_date_condition_uses_iso_date() {
    let result = names(
        &builder(),
        json!({"filterType": "date", "colId": "hired", "type": "lessThan", "filter": "2021-01-01"}),
    )
    .await;
    assert_eq!(result, vec![json!("Alice"), json!("Carla")]);
}

#[tokio::test]
async fn test_empty_join_identities() {
    let all = names(&builder(), json!({"filterType": "join", "type": "AND", "conditions": []})).await;
    assert_eq!(all.len(), 3);
    let none = names(&builder(), json!({"filterType": "join", "type": "OR", "conditions": []})).await;
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_advanced_payload_rejected_when_disabled() {
    let b = QueryBuilder::builder(Arc::new(staff()))
        .table("staff")
        .build()
        .unwrap();
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(json!({"filterType": "boolean", "colId": "active", "type": "true"})),
        ..Default::default()
    };
    let err = b.get_rows(&request).await.unwrap_err();
    let QueryError::InvalidRequest(errors) = err else {
        panic!("expected validation error, got {:?}", err);
    };
    assert_eq!(errors[0].field, "filterModel");
}

#[tokio::test]
async fn test_unknown_join_operator() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(json!({"filterType": "join", "type": "XOR", "conditions": []})),
        ..Default::default()
    };
    let err = builder().get_rows(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "Unrecognized join operator: XOR");
}

#[tokio::test]
async fn test_custom_advanced_recognizer() {
    let mut settings = Settings::default();
    settings.grid.enable_advanced_filter = true;
    let b = QueryBuilder::builder(Arc::new(staff()))
        .table("staff")
        .settings(settings)
        .advanced_recognizer(|payload| {
            if payload.get("filterType")?.as_str()? != "nameIs" {
                return None;
            }
            let value = payload.get("value")?.as_str()?;
            Some(AdvancedFilter::Column {
                col_id: "name".into(),
                condition: AdvancedCondition::Text {
                    kind: TextAdvancedType::Equals,
                    filter: Some(value.to_string()),
                },
            })
        })
        .build()
        .unwrap();

    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(json!({"filterType": "nameIs", "value": "bob"})),
        ..Default::default()
    };
    let (query, _) = b.build_query(&request).await.unwrap();
    assert!(query
        .to_sql(Dialect::Postgres)
        .contains("LOWER(\"name\") = 'bob'"));
    assert_eq!(b.get_rows(&request).await.unwrap().row_data.len(), 1);
}
