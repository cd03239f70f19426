//! Request validation against column definitions.

use std::sync::Arc;

use gridquery::config::Settings;
use gridquery::error::ValidationError;
use gridquery::filter::ColumnFilter;
use gridquery::model::{ColumnDef, ColumnVO, ScalarType, ServerSideGetRowsRequest, SortModelItem};
use gridquery::source::MemoryDataSource;
use gridquery::{QueryBuilder, QueryError};
use serde_json::json;

fn builder() -> QueryBuilder {
    let source = MemoryDataSource::new(
        "trades",
        &[
            ("desk", ScalarType::Text),
            ("trader", ScalarType::Text),
            ("notional", ScalarType::Decimal),
            ("year", ScalarType::Integer),
        ],
    );
    QueryBuilder::builder(Arc::new(source))
        .table("trades")
        .column_defs(vec![
            ColumnDef::new("desk").filter(ColumnFilter::text()),
            ColumnDef::new("trader")
                .enable_row_group(false)
                .enable_pivot(false)
                .sortable(false),
            ColumnDef::new("notional")
                .filter(ColumnFilter::number())
                .allowed_agg_funcs(&["sum", "avg"]),
            ColumnDef::new("year").enable_value(false),
        ])
        .build()
        .unwrap()
}

fn errors(b: &QueryBuilder, request: &ServerSideGetRowsRequest) -> Vec<ValidationError> {
    match b.validate_request(request) {
        Err(QueryError::InvalidRequest(errors)) => errors,
        other => panic!("expected validation errors, got {:?}", other),
    }
}

fn fields(errors: &[ValidationError]) -> Vec<&str> {
    errors.iter().map(|e| e.field.as_str()).collect()
}

#[test]
fn test_valid_request_passes() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        row_group_cols: vec![ColumnVO::new("desk")],
        value_cols: vec![ColumnVO::new("notional").with_agg_func("sum")],
        sort_model: vec![SortModelItem::asc("ag-Grid-AutoColumn"), SortModelItem::desc("notional")],
        filter_model: Some(json!({"desk": {"filterType": "text", "type": "equals", "filter": "FX"}})),
        ..Default::default()
    };
    assert!(builder().validate_request(&request).is_ok());
}

#[test]
fn test_all_problems_are_collected() {
    let request = ServerSideGetRowsRequest {
        start_row: 50,
        end_row: 10,
        row_group_cols: vec![ColumnVO::new("trader"), ColumnVO::new("book")],
        value_cols: vec![
            ColumnVO::new("year").with_agg_func("sum"),
            ColumnVO::new("notional").with_agg_func("max"),
            ColumnVO::new("notional"),
        ],
        pivot_cols: vec![ColumnVO::new("trader")],
        group_keys: vec![json!("a"), json!("b"), json!("c")],
        sort_model: vec![SortModelItem::asc("trader"), SortModelItem::asc("missing")],
        ..Default::default()
    };
    let errors = errors(&builder(), &request);
    assert_eq!(
        fields(&errors),
        vec![
            "rowGroupCols[0]",
            "rowGroupCols[1]",
            "valueCols[0]",
            "valueCols[1].aggFunc",
            "valueCols[2].aggFunc",
            "pivotCols[0]",
            "sortModel[0].colId",
            "sortModel[1].colId",
            "groupKeys",
            "endRow",
        ]
    );
    assert_eq!(errors[0].message, "is not enabled for this use");
    assert_eq!(errors[1].message, "unknown column");
    assert_eq!(errors[1].rejected_value, Some(json!("book")));
    assert_eq!(errors[3].message, "aggregate function is not allowed for this column");
    assert_eq!(errors[4].message, "is required for value columns");
    assert_eq!(errors[6].message, "column is not sortable");
}

#[test]
fn test_filter_model_columns_are_checked() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(json!({
            "trader": {"filterType": "text", "type": "equals", "filter": "x"},
            "book": {"filterType": "text", "type": "equals", "filter": "y"}
        })),
        ..Default::default()
    };
    let errors = errors(&builder(), &request);
    let mut found: Vec<_> = errors
        .iter()
        .map(|e| (e.field.as_str(), e.message.as_str()))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            ("filterModel.book", "unknown column"),
            ("filterModel.trader", "filtering is disabled for this column"),
        ]
    );
}

#[test]
fn test_advanced_filter_needs_setting() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        filter_model: Some(json!({"filterType": "text", "colId": "desk", "type": "equals", "filter": "FX"})),
        ..Default::default()
    };
    let errors = errors(&builder(), &request);
    assert_eq!(fields(&errors), vec!["filterModel"]);
    assert_eq!(errors[0].message, "advanced filtering is disabled");
}

#[test]
fn test_pivot_result_names_are_not_columns() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        pivot_mode: true,
        row_group_cols: vec![ColumnVO::new("desk")],
        pivot_cols: vec![ColumnVO::new("year")],
        value_cols: vec![ColumnVO::new("notional").with_agg_func("sum")],
        sort_model: vec![SortModelItem::desc("2024_notional")],
        filter_model: Some(json!({
            "2024_notional": {"filterType": "number", "type": "greaterThan", "filter": 0}
        })),
        ..Default::default()
    };
    assert!(builder().validate_request(&request).is_ok());

    // Outside pivot mode the same name is just an unknown column.
    let mut flat = request.clone();
    flat.pivot_mode = false;
    let errors = errors(&builder(), &flat);
    assert_eq!(
        fields(&errors),
        vec!["sortModel[0].colId", "filterModel.2024_notional"]
    );
}

#[test]
fn test_error_display_lists_every_field() {
    let request = ServerSideGetRowsRequest {
        start_row: 5,
        end_row: 1,
        group_keys: vec![json!("x")],
        ..Default::default()
    };
    let err = builder().validate_request(&request).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Request validation failed:\n- groupKeys: has more keys than rowGroupCols\n- endRow: must not be less than startRow"
    );
}

#[tokio::test]
async fn test_get_rows_validates_before_touching_source() {
    let request = ServerSideGetRowsRequest {
        end_row: 100,
        row_group_cols: vec![ColumnVO::new("trader")],
        ..Default::default()
    };
    let err = builder().get_rows(&request).await.unwrap_err();
    assert!(matches!(err, QueryError::InvalidRequest(ref e) if e.len() == 1));
}

#[test]
fn test_empty_registry_accepts_any_column() {
    let source = MemoryDataSource::new("trades", &[("desk", ScalarType::Text)]);
    let b = QueryBuilder::builder(Arc::new(source))
        .settings(Settings {
            table: Some("trades".into()),
            ..Default::default()
        })
        .build()
        .unwrap();
    let request = ServerSideGetRowsRequest {
        end_row: 10,
        row_group_cols: vec![ColumnVO::new("anything")],
        sort_model: vec![SortModelItem::asc("whatever")],
        ..Default::default()
    };
    assert!(b.validate_request(&request).is_ok());
}
