//! ORDER BY planning.

use crate::model::{ServerSideGetRowsRequest, SortDirection, SortModelItem};
use crate::sql::{col, Expr, OrderByExpr, SelectExpr};

use super::pivot::PivotingContext;

/// Column id of the grid's auto-generated group column.
pub const AUTO_GROUP_COLUMN: &str = "ag-Grid-AutoColumn";

pub fn is_auto_group_column(col_id: &str) -> bool {
    col_id.eq_ignore_ascii_case(AUTO_GROUP_COLUMN)
}

/// Order the result according to the sort model.
///
/// While pivoting: active group columns first, then generated pivot columns.
/// While grouping: active group columns first, then aggregated value columns
/// using their select expression. Otherwise every sorted column in client
/// order. Within each part the client's order is kept.
pub fn plan_order_by(
    request: &ServerSideGetRowsRequest,
    select: &[SelectExpr],
    pivot: &PivotingContext,
) -> Vec<OrderByExpr> {
    let sorts: Vec<&SortModelItem> = request
        .sort_model
        .iter()
        .filter(|s| !is_auto_group_column(&s.col_id))
        .collect();

    let pivoting = request.is_pivoting();
    if !pivoting && !request.is_grouping() {
        return sorts
            .into_iter()
            .map(|s| ordered(col(&s.col_id), s.sort))
            .collect();
    }

    let group_cols = request.active_group_cols();
    let mut order_by: Vec<OrderByExpr> = sorts
        .iter()
        .filter(|s| group_cols.iter().any(|g| g.field == s.col_id))
        .map(|s| ordered(col(&s.col_id), s.sort))
        .collect();

    if pivoting {
        order_by.extend(sorts.iter().filter_map(|s| {
            pivot
                .expression(&s.col_id)
                .map(|expr| ordered(expr.clone(), s.sort))
        }));
    } else {
        order_by.extend(sorts.iter().filter_map(|s| {
            request
                .value_cols
                .iter()
                .find(|v| v.field == s.col_id)
                .and_then(|v| select.iter().find(|e| e.alias.as_deref() == Some(&v.field)))
                .map(|e| ordered(e.expr.clone(), s.sort))
        }));
    }

    order_by
}

fn ordered(expr: Expr, dir: SortDirection) -> OrderByExpr {
    match dir {
        SortDirection::Asc => OrderByExpr::asc(expr),
        SortDirection::Desc => OrderByExpr::desc(expr),
    }
}
