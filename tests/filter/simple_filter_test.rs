//! Integration tests for column-keyed filter models.
//!
//! Each filter payload is recognized, compiled and evaluated against the
//! in-memory source; assertions are on the rows that survive.

use std::sync::Arc;

use chrono::NaiveDate;
use gridquery::config::Settings;
use gridquery::filter::{ColumnFilter, QuickFilterParams, ScalarFilterParams, TextFilterParams};
use gridquery::model::{ColumnDef, ColumnVO, ScalarType, ServerSideGetRowsRequest, Value};
use gridquery::source::MemoryDataSource;
use gridquery::sql::{col, Dialect, ExprExt};
use gridquery::{QueryBuilder, QueryError};
use serde_json::{json, Value as Json};

fn people() -> MemoryDataSource {
    let day = |d: u32| Value::Date(NaiveDate::from_ymd_opt(2024, 1, d).unwrap());
    MemoryDataSource::new(
        "people",
        &[
            ("name", ScalarType::Text),
            ("team", ScalarType::Text),
            ("age", ScalarType::Integer),
            ("joined", ScalarType::Date),
        ],
    )
    .with_rows(vec![
        vec!["Alice".into(), "A".into(), Value::Int(31), day(5)],
        vec!["bob".into(), "B".into(), Value::Int(25), day(15)],
        vec!["Carol".into(), "C".into(), Value::Null, day(20)],
        vec!["Dave".into(), Value::Null, Value::Int(40), day(25)],
        vec!["50% Eve".into(), "a".into(), Value::Int(19), Value::Null],
    ])
    .unwrap()
}

fn builder() -> QueryBuilder {
    QueryBuilder::builder(Arc::new(people()))
        .table("people")
        .build()
        .unwrap()
}

async fn names_matching(b: &QueryBuilder, filter_model: Json) -> Vec<String> {
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
        .map(|row| row["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

// ============================================================================
// Set Filter
// ============================================================================

#[tokio::test]
async fn test_empty_set_matches_nothing() {
    let names = names_matching(&builder(), json!({"team": {"filterType": "set", "values": []}})).await;
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_null_in_set_matches_blanks() {
    let names =
        names_matching(&builder(), json!({"team": {"filterType": "set", "values": [null]}})).await;
    assert_eq!(names, vec!["Dave"]);
}

#[tokio::test]
async fn test_set_matches_exact_values() {
    let names = names_matching(
        &builder(),
        json!({"team": {"filterType": "set", "values": ["A", "B"]}}),
    )
    .await;
    // Case sensitive by default, so "a" is not included.
    assert_eq!(names, vec!["Alice", "bob"]);
}

#[tokio::test]
async fn test_case_insensitive_set() {
    let b = QueryBuilder::builder(Arc::new(people()))
        .table("people")
        .column_defs(vec![
            ColumnDef::new("name").filter(ColumnFilter::text()),
            ColumnDef::new("team").filter(ColumnFilter::Set(
                gridquery::filter::SetFilterParams::default().case_sensitive(false),
            )),
        ])
        .build()
        .unwrap();
    let names = names_matching(&b, json!({"team": {"filterType": "set", "values": ["A"]}})).await;
    assert_eq!(names, vec!["Alice", "50% Eve"]);
}

// ============================================================================
// Combined Conditions
// ============================================================================

#[tokio::test]
async fn test_combined_and_on_one_column_matches_nothing() {
    let names = names_matching(
        &builder(),
        json!({"team": {
            "filterType": "text",
            "operator": "AND",
            "conditions": [
                {"filterType": "text", "type": "equals", "filter": "A"},
                {"filterType": "text", "type": "equals", "filter": "B"}
            ]
        }}),
    )
    .await;
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_combined_or_matches_either() {
    let names = names_matching(
        &builder(),
        json!({"name": {
            "filterType": "text",
            "operator": "OR",
            "conditions": [
                {"type": "equals", "filter": "alice"},
                {"type": "equals", "filter": "BOB"}
            ]
        }}),
    )
    .await;
    assert_eq!(names, vec!["Alice", "bob"]);
}

// ============================================================================
// Text, Number and Date Filters
// ============================================================================

#[tokio::test]
async fn test_text_contains_is_case_insensitive() {
    let names = names_matching(
        &builder(),
        json!({"name": {"filterType": "text", "type": "contains", "filter": "A"}}),
    )
    .await;
    assert_eq!(names, vec!["Alice", "Carol", "Dave"]);
}

#[tokio::test]
async fn test_text_wildcards_are_literal() {
    let names = names_matching(
        &builder(),
        json!({"name": {"filterType": "text", "type": "startsWith", "filter": "50%"}}),
    )
    .await;
    assert_eq!(names, vec!["50% Eve"]);
}

#[tokio::test]
async fn test_number_in_range_is_exclusive_by_default() {
    let names = names_matching(
        &builder(),
        json!({"age": {"filterType": "number", "type": "inRange", "filter": 25, "filterTo": 40}}),
    )
    .await;
    assert_eq!(names, vec!["Alice"]);
}

#[tokio::test]
async fn test_include_blanks_in_less_than() {
    let b = QueryBuilder::builder(Arc::new(people()))
        .table("people")
        .column_defs(vec![
            ColumnDef::new("name").filter(ColumnFilter::text()),
            ColumnDef::new("age").filter(ColumnFilter::Number(
                ScalarFilterParams::default().include_blanks_in_less_than(true),
            )),
        ])
        .build()
        .unwrap();
    let names = names_matching(
        &b,
        json!({"age": {"filterType": "number", "type": "lessThan", "filter": 26}}),
    )
    .await;
    assert_eq!(names, vec!["bob", "Carol", "50% Eve"]);
}

#[tokio::test]
async fn test_date_greater_than() {
    let names = names_matching(
        &builder(),
        json!({"joined": {"filterType": "date", "type": "greaterThan", "dateFrom": "2024-01-15 00:00:00"}}),
    )
    .await;
    assert_eq!(names, vec!["Carol", "Dave"]);
}

#[tokio::test]
async fn test_date_blank() {
    let names =
        names_matching(&builder(), json!({"joined": {"filterType": "date", "type": "blank"}})).await;
    assert_eq!(names, vec!["50% Eve"]);
}

#[tokio::test]
async fn test_bad_number_literal_is_invalid_request() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(json!({"age": {"filterType": "number", "type": "equals", "filter": "ten"}})),
        ..Default::default()
    };
    let err = builder().get_rows(&request).await.unwrap_err();
    let QueryError::InvalidRequest(errors) = err else {
        panic!("expected validation error, got {:?}", err);
    };
    assert_eq!(errors[0].field, "filterModel.age.filter");
    assert_eq!(errors[0].rejected_value, Some(json!("ten")));
}

#[tokio::test]
async fn test_unknown_filter_type_is_unrecognized() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(json!({"name": {"filterType": "text", "type": "soundsLike", "filter": "x"}})),
        ..Default::default()
    };
    let err = builder().get_rows(&request).await.unwrap_err();
    assert!(matches!(err, QueryError::Unrecognized { .. }));
}

// ============================================================================
// Multi, Quick and External Filters
// ============================================================================

#[tokio::test]
async fn test_multi_filter_ands_children() {
    let names = names_matching(
        &builder(),
        json!({"name": {
            "filterType": "multi",
            "filterModels": [
                {"filterType": "text", "type": "contains", "filter": "a"},
                null,
                {"filterType": "set", "values": ["Alice", "Dave", "bob"]}
            ]
        }}),
    )
    .await;
    assert_eq!(names, vec!["Alice", "Dave"]);
}

#[tokio::test]
async fn test_quick_filter_every_word_in_some_field() {
    let b = QueryBuilder::builder(Arc::new(people()))
        .table("people")
        .quick_filter(QuickFilterParams::default().fields(&["name", "team"]))
        .build()
        .unwrap();
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        quick_filter: Some("  a  L ".into()),
        ..Default::default()
    };
    let names: Vec<_> = b
        .get_rows(&request)
        .await
        .unwrap()
        .row_data
        .iter()
        .map(|r| r["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("Alice"), json!("Carol")]);
}

#[tokio::test]
async fn test_external_filter_hook() {
    let b = QueryBuilder::builder(Arc::new(people()))
        .table("people")
        .external_filter(|payload| {
            payload
                .get("minAge")
                .and_then(Json::as_i64)
                .map(|min| col("age").gte(min))
        })
        .build()
        .unwrap();
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        external_filter: Some(json!({"minAge": 30})),
        ..Default::default()
    };
    let (query, _) = b.build_query(&request).await.unwrap();
    assert!(query.to_sql(Dialect::Postgres).contains("\"age\" >= 30"));
    assert_eq!(b.get_rows(&request).await.unwrap().row_data.len(), 2);
}

fn grouped_by_team(settings: Settings) -> (QueryBuilder, ServerSideGetRowsRequest) {
    let b = QueryBuilder::builder(Arc::new(people()))
        .table("people")
        .settings(settings)
        .build()
        .unwrap();
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        row_group_cols: vec![ColumnVO::new("team")],
        value_cols: vec![ColumnVO::new("age").with_agg_func("sum")],
        filter_model: Some(json!({"age": {"filterType": "number", "type": "greaterThan", "filter": 30}})),
        ..Default::default()
    };
    (b, request)
}

async fn teams(b: &QueryBuilder, request: &ServerSideGetRowsRequest) -> Vec<Json> {
    b.get_rows(request)
        .await
        .unwrap()
        .row_data
        .iter()
        .map(|r| r["team"].clone())
        .collect()
}

#[tokio::test]
async fn test_group_agg_filtering_keeps_groups_with_passing_rows() {
    let mut settings = Settings::default();
    settings.grid.group_agg_filtering = true;
    let (b, request) = grouped_by_team(settings);

    let (query, _) = b.build_query(&request).await.unwrap();
    assert!(query.having.is_none());
    let sql = query.to_sql(Dialect::Postgres);
    assert!(sql.contains("WHERE EXISTS (SELECT"), "{}", sql);
    assert!(sql.contains("\"team\" = \"people\".\"team\""), "{}", sql);

    // The blank team passes through Dave.
    assert_eq!(teams(&b, &request).await, vec![json!("A"), json!(null)]);
}

#[tokio::test]
async fn test_group_agg_filtering_applies_plain_filters_at_leaf_level() {
    let mut settings = Settings::default();
    settings.grid.group_agg_filtering = true;
    let (b, mut request) = grouped_by_team(settings);
    request.group_keys = vec![json!("A")];

    let (query, _) = b.build_query(&request).await.unwrap();
    let sql = query.to_sql(Dialect::Postgres);
    assert!(!sql.contains("EXISTS"), "{}", sql);
    assert!(sql.contains("CAST(\"age\" AS NUMERIC) > 30"), "{}", sql);
}

#[tokio::test]
async fn test_suppressed_group_filters_apply_only_to_leaves() {
    let mut settings = Settings::default();
    settings.grid.suppress_agg_filtered_only = true;
    let (b, mut request) = grouped_by_team(settings);
    request.quick_filter = Some("nobody".into());

    let (query, _) = b.build_query(&request).await.unwrap();
    assert!(query.where_clause.is_none());
    assert_eq!(teams(&b, &request).await.len(), 5);

    request.quick_filter = None;
    request.group_keys = vec![json!("A")];
    assert_eq!(b.get_rows(&request).await.unwrap().row_data.len(), 1);
    request.group_keys = vec![json!("B")];
    assert!(b.get_rows(&request).await.unwrap().row_data.is_empty());
}

#[tokio::test]
async fn test_every_invalid_literal_is_reported_with_request_errors() {
    let request = ServerSideGetRowsRequest {
        start_row: 10,
        end_row: 5,
        filter_model: Some(json!({
            "age": {"filterType": "number", "type": "inRange", "filter": "old", "filterTo": "older"},
            "joined": {"filterType": "date", "type": "equals", "dateFrom": "someday"},
            "name": {"filterType": "text", "type": "equals", "filter": "Alice"}
        })),
        ..Default::default()
    };
    let err = builder().get_rows(&request).await.unwrap_err();
    let QueryError::InvalidRequest(errors) = err else {
        panic!("expected validation errors, got {:?}", err);
    };
    let mut fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(
        fields,
        vec![
            "endRow",
            "filterModel.age.filter",
            "filterModel.age.filterTo",
            "filterModel.joined.dateFrom",
        ]
    );
}

#[tokio::test]
async fn test_text_params_restrict_options() {
    let b = QueryBuilder::builder(Arc::new(people()))
        .table("people")
        .column_def(ColumnDef::new("name").filter(ColumnFilter::Text(
            TextFilterParams::default().filter_options(vec![
                gridquery::filter::SimpleFilterType::Equals,
            ]),
        )))
        .build()
        .unwrap();
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(json!({"name": {"filterType": "text", "type": "contains", "filter": "a"}})),
        ..Default::default()
    };
    assert!(matches!(
        b.get_rows(&request).await,
        Err(QueryError::InvalidRequest(_))
    ));
}
