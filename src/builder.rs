//! Request compilation and execution.
//!
//! [`QueryBuilder`] turns one [`ServerSideGetRowsRequest`] into a [`Query`]
//! and runs it against its [`DataSource`]:
//!
//! ```text
//! pivot context -> select -> where -> group by -> having -> order by -> paging
//! ```
//!
//! The builder is immutable once built and cheap to clone; every request
//! gets its own [`Query`] and [`PivotingContext`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::debug;

use crate::config::{Settings, SettingsError};
use crate::error::{QueryError, QueryResult, ValidationError, Violations};
use crate::filter::quick::quick_filter_predicate;
use crate::filter::recognize::JsonMap;
use crate::filter::{
    AdvancedFilter, FieldTypes, FilterModel, FilterRecognizer, FilterTarget, PredicateCompiler,
    QuickFilterParams, SimpleFilter,
};
use crate::mapper;
use crate::model::{
    ColumnDef, ColumnRegistry, ColumnVO, LoadSuccessParams, ScalarType, ServerSideGetRowsRequest,
    Value,
};
use crate::plan::{
    group_key_predicates, is_auto_group_column, original_col_name, plan_grouping, plan_order_by,
    AggregateRegistry, PivotingContext,
};
use crate::source::{DataSource, SourceTypes};
use crate::sql::{
    col, count_distinct, count_star, disjunction, exists, lit_int, table_col, Expr, ExprExt, Query,
    SelectExpr, TableRef,
};

/// Turns the opaque `externalFilter` payload into a predicate.
pub type ExternalFilterHook = Arc<dyn Fn(&Json) -> Option<Expr> + Send + Sync>;

/// Compiles grid requests and executes them against a data source.
#[derive(Clone)]
pub struct QueryBuilder {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn DataSource>,
    settings: Settings,
    table: TableRef,
    columns: ColumnRegistry,
    aggregates: AggregateRegistry,
    recognizer: FilterRecognizer,
    quick_filter: QuickFilterParams,
    external_filter: Option<ExternalFilterHook>,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.inner.table.table)
            .field("settings", &self.inner.settings)
            .field("columns", &self.inner.columns.fields().collect::<Vec<_>>())
            .field("aggregates", &self.inner.aggregates)
            .finish()
    }
}

/// Configures a [`QueryBuilder`].
pub struct QueryBuilderConfig {
    source: Arc<dyn DataSource>,
    settings: Settings,
    table: Option<String>,
    columns: ColumnRegistry,
    aggregates: AggregateRegistry,
    recognizer: FilterRecognizer,
    quick_filter: QuickFilterParams,
    external_filter: Option<ExternalFilterHook>,
}

impl QueryBuilderConfig {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Source table, optionally `schema.table`. Overrides `settings.table`.
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn column_defs(mut self, defs: Vec<ColumnDef>) -> Self {
        for def in defs {
            self.columns.insert(def);
        }
        self
    }

    pub fn column_def(mut self, def: ColumnDef) -> Self {
        self.columns.insert(def);
        self
    }

    /// Add or replace an aggregate function usable as `aggFunc`.
    pub fn register_aggregate(
        mut self,
        name: &str,
        f: impl Fn(Expr) -> Expr + Send + Sync + 'static,
    ) -> Self {
        self.aggregates.register(name, f);
        self
    }

    pub fn recognizer(mut self, recognizer: FilterRecognizer) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn simple_recognizer(
        mut self,
        f: impl Fn(&str, &JsonMap) -> Option<SimpleFilter> + Send + Sync + 'static,
    ) -> Self {
        self.recognizer = self.recognizer.with_simple(f);
        self
    }

    pub fn advanced_recognizer(
        mut self,
        f: impl Fn(&JsonMap) -> Option<AdvancedFilter> + Send + Sync + 'static,
    ) -> Self {
        self.recognizer = self.recognizer.with_advanced(f);
        self
    }

    pub fn quick_filter(mut self, params: QuickFilterParams) -> Self {
        self.quick_filter = params;
        self
    }

    pub fn external_filter(
        mut self,
        hook: impl Fn(&Json) -> Option<Expr> + Send + Sync + 'static,
    ) -> Self {
        self.external_filter = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> QueryResult<QueryBuilder> {
        self.settings.validate()?;
        let table = match self.table {
            Some(table) => table,
            None => self.settings.resolved_table()?.ok_or_else(|| {
                SettingsError::InvalidConfig("no source table configured".into())
            })?,
        };
        Ok(QueryBuilder {
            inner: Arc::new(Inner {
                source: self.source,
                settings: self.settings,
                table: TableRef::parse(&table),
                columns: self.columns,
                aggregates: self.aggregates,
                recognizer: self.recognizer,
                quick_filter: self.quick_filter,
                external_filter: self.external_filter,
            }),
        })
    }
}

const LEAF_ALIAS: &str = "leaf";
const GROUP_ALIAS: &str = "grp";

/// Filters compiled before any data source access.
struct LevelFilters {
    where_predicates: Vec<Expr>,
    /// Filters on generated pivot columns; compiled once the pivot context
    /// exists.
    pivot_filters: Vec<(String, SimpleFilter)>,
}

/// How the filter model applies to the requested level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelFiltering {
    /// Every filter restricts the rows directly.
    Basic,
    /// Group levels are restricted by their keys only.
    Suppressed,
    /// Value column filters keep a group when a leaf or an aggregate
    /// beneath it passes.
    Aggregated,
}

/// Predicates and projections for one request, before assembly.
struct Compiled {
    select: Vec<SelectExpr>,
    group_by: Vec<Expr>,
    where_predicates: Vec<Expr>,
    having: Vec<Expr>,
    pivot: PivotingContext,
}

impl QueryBuilder {
    pub fn builder(source: Arc<dyn DataSource>) -> QueryBuilderConfig {
        QueryBuilderConfig {
            source,
            settings: Settings::default(),
            table: None,
            columns: ColumnRegistry::default(),
            aggregates: AggregateRegistry::default(),
            recognizer: FilterRecognizer::default(),
            quick_filter: QuickFilterParams::default(),
            external_filter: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn table(&self) -> &TableRef {
        &self.inner.table
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.inner.columns
    }

    /// Fetch one block of rows.
    ///
    /// `rowCount` is set once the last page is reached, that is when fewer
    /// rows come back than the window asked for.
    pub async fn get_rows(
        &self,
        request: &ServerSideGetRowsRequest,
    ) -> QueryResult<LoadSuccessParams> {
        let (query, pivot) = self.build_query(request).await?;
        let result = self.inner.source.execute(&query).await?;
        let row_data = mapper::map_rows(&result, !self.inner.settings.grid.suppress_field_dot_notation);

        let fetched = row_data.len() as u64;
        let page_size = request.page_size();
        let row_count = (page_size == 0 || fetched < page_size)
            .then(|| request.start_row.saturating_add(fetched));
        debug!(rows = fetched, ?row_count, "fetched rows");

        Ok(LoadSuccessParams {
            row_data,
            row_count,
            group_level_info: None,
            pivot_result_fields: request.is_pivoting().then(|| pivot.result_fields()),
        })
    }

    /// Count the rows, or the groups at the counted level, that the request
    /// matches regardless of its window.
    pub async fn count_rows(&self, request: &ServerSideGetRowsRequest) -> QueryResult<u64> {
        let compiled = self.compile(request).await?;
        let grid = &self.inner.settings.grid;

        // Root groups are counted even below the last group level unless
        // child rows are paginated.
        let counted = if request.row_group_cols.is_empty() {
            None
        } else if grid.paginate_child_rows {
            request.row_group_cols.get(request.group_keys.len())
        } else {
            request.row_group_cols.first()
        };

        let mut query = Query::new().from(self.inner.table.clone());
        for predicate in &compiled.where_predicates {
            query = query.filter(predicate.clone());
        }

        let query = match counted {
            None => query.select(vec![SelectExpr::new(count_star())]),
            Some(group_col) => {
                let mut query = query.select(vec![SelectExpr::new(count_distinct(col(
                    &group_col.field,
                )))]);
                if !compiled.having.is_empty() {
                    let group_by = if compiled.group_by.is_empty() {
                        vec![col(&group_col.field)]
                    } else {
                        compiled.group_by.clone()
                    };
                    let mut groups = Query::new()
                        .select(vec![SelectExpr::new(col(&group_col.field))])
                        .from(self.inner.table.clone())
                        .group_by(group_by);
                    for predicate in &compiled.where_predicates {
                        groups = groups.filter(predicate.clone());
                    }
                    for predicate in compiled.having {
                        groups = groups.having(predicate);
                    }
                    query = query.filter(col(&group_col.field).in_subquery(groups));
                }
                query
            }
        };

        debug!(sql = %query.to_sql(self.inner.settings.dialect), "count query");
        Ok(self.inner.source.count(&query).await?)
    }

    /// Distinct values of a column for the set filter, sorted ascending.
    pub async fn supply_set_filter_values(&self, field: &str) -> QueryResult<Vec<Value>> {
        let columns = &self.inner.columns;
        if !columns.knows(field) {
            return Err(QueryError::invalid(field, "unknown column"));
        }
        if !columns.is_empty() && columns.filter_for(field).is_none() {
            return Err(QueryError::invalid(field, "filtering is disabled for this column"));
        }
        let values = self.inner.source.distinct_values(field).await?;
        debug!(field, values = values.len(), "supplied set filter values");
        Ok(values)
    }

    /// Compile a request without executing it.
    pub async fn build_query(
        &self,
        request: &ServerSideGetRowsRequest,
    ) -> QueryResult<(Query, PivotingContext)> {
        let compiled = self.compile(request).await?;

        let mut query = Query::new()
            .select(compiled.select)
            .from(self.inner.table.clone());
        for predicate in compiled.where_predicates {
            query = query.filter(predicate);
        }
        if !compiled.group_by.is_empty() {
            query = query.group_by(compiled.group_by);
        }
        for predicate in compiled.having {
            query = query.having(predicate);
        }

        let order_by = plan_order_by(request, &query.select, &compiled.pivot);
        debug!(items = order_by.len(), "planned order by");
        if !order_by.is_empty() {
            query = query.order_by(order_by);
        }

        let page_size = request.page_size();
        if page_size > 0 {
            query = query.limit(page_size);
        }
        if request.start_row > 0 {
            query = query.offset(request.start_row);
        }

        debug!(sql = %query.to_sql(self.inner.settings.dialect), "compiled request");
        Ok((query, compiled.pivot))
    }

    /// Check the request against the column definitions and settings,
    /// collecting every problem. An aggregate function missing from the
    /// registry is unrecognized and fails at once.
    pub fn validate_request(&self, request: &ServerSideGetRowsRequest) -> QueryResult<()> {
        let columns = &self.inner.columns;
        for c in &request.value_cols {
            if let Some(name) = c.agg_func.as_deref() {
                if !self.inner.aggregates.contains(name) {
                    return Err(QueryError::unrecognized("aggregate function", name));
                }
            }
        }

        let mut errors = Vec::new();

        for (i, c) in request.row_group_cols.iter().enumerate() {
            check_column(&mut errors, columns, &format!("rowGroupCols[{}]", i), c, |d| {
                d.enable_row_group
            });
        }
        for (i, c) in request.value_cols.iter().enumerate() {
            let path = format!("valueCols[{}]", i);
            check_column(&mut errors, columns, &path, c, |d| d.enable_value);
            match c.agg_func.as_deref() {
                None => errors.push(ValidationError::new(
                    format!("{}.aggFunc", path),
                    "is required for value columns",
                )),
                Some(name) if columns.get(&c.field).is_some_and(|d| !d.allows_agg_func(name)) => {
                    errors.push(
                        ValidationError::new(
                            format!("{}.aggFunc", path),
                            "aggregate function is not allowed for this column",
                        )
                        .with_rejected(Json::from(name)),
                    )
                }
                Some(_) => {}
            }
        }
        for (i, c) in request.pivot_cols.iter().enumerate() {
            check_column(&mut errors, columns, &format!("pivotCols[{}]", i), c, |d| {
                d.enable_pivot
            });
        }

        for (i, sort) in request.sort_model.iter().enumerate() {
            if is_auto_group_column(&sort.col_id) || self.is_pivot_result_name(request, &sort.col_id)
            {
                continue;
            }
            let path = format!("sortModel[{}].colId", i);
            match columns.get(&sort.col_id) {
                Some(def) if !def.sortable => errors.push(
                    ValidationError::new(path, "column is not sortable")
                        .with_rejected(Json::from(sort.col_id.as_str())),
                ),
                Some(_) => {}
                None if columns.knows(&sort.col_id) => {}
                None => errors.push(
                    ValidationError::new(path, "unknown column")
                        .with_rejected(Json::from(sort.col_id.as_str())),
                ),
            }
        }

        if request.group_keys.len() > request.row_group_cols.len() {
            errors.push(
                ValidationError::new("groupKeys", "has more keys than rowGroupCols")
                    .with_rejected(Json::Array(request.group_keys.clone())),
            );
        }
        if request.end_row < request.start_row {
            errors.push(
                ValidationError::new("endRow", "must not be less than startRow")
                    .with_rejected(Json::from(request.end_row)),
            );
        }

        if let Some(Json::Object(payload)) = &request.filter_model {
            if !FilterRecognizer::is_column_keyed(payload) {
                if !self.inner.settings.grid.enable_advanced_filter {
                    errors.push(ValidationError::new(
                        "filterModel",
                        "advanced filtering is disabled",
                    ));
                }
            } else {
                for col_id in payload.keys() {
                    if self.is_pivot_result_name(request, col_id) {
                        continue;
                    }
                    let path = format!("filterModel.{}", col_id);
                    if !columns.knows(col_id) {
                        errors.push(ValidationError::new(path, "unknown column"));
                    } else if !columns.is_empty() && columns.filter_for(col_id).is_none() {
                        errors.push(ValidationError::new(
                            path,
                            "filtering is disabled for this column",
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(QueryError::InvalidRequest(errors))
        }
    }

    /// A generated pivot column name refers back to a value column through
    /// the part after its last separator.
    fn is_pivot_result_name(&self, request: &ServerSideGetRowsRequest, name: &str) -> bool {
        if !request.is_pivoting() {
            return false;
        }
        let separator = &self.inner.settings.pivot.separator;
        let original = original_col_name(name, separator);
        original != name && request.value_cols.iter().any(|v| v.field == original)
    }

    async fn compile(&self, request: &ServerSideGetRowsRequest) -> QueryResult<Compiled> {
        let filters = self.compile_filters(request)?;

        let inner = &*self.inner;
        let settings = &inner.settings;
        let pivot = if request.is_pivoting() {
            self.pivot_context(request).await?
        } else {
            PivotingContext::default()
        };

        let child_count = (settings.grid.get_child_count && request.is_grouping())
            .then_some(settings.grid.child_count_field_name.as_str());
        let projection: Vec<String> = inner.columns.fields().map(String::from).collect();
        let mut plan = plan_grouping(request, &inner.aggregates, &projection, child_count)?;
        // Without generated columns the level keeps its plain projection.
        if !pivot.is_empty() {
            if !request.is_grouping() {
                plan.select.clear();
            }
            plan.select.extend(pivot.select_exprs());
        }
        debug!(select = plan.select.len(), group_by = plan.group_by.len(), "planned select");

        let having = self.compile_pivot_filters(&filters.pivot_filters, &pivot)?;
        debug!(
            where_predicates = filters.where_predicates.len(),
            having = having.len(),
            "compiled filters"
        );

        Ok(Compiled {
            select: plan.select,
            group_by: plan.group_by,
            where_predicates: filters.where_predicates,
            having,
            pivot,
        })
    }

    /// Validate the request and compile every filter that needs no data
    /// source access. All validation failures are reported together.
    fn compile_filters(&self, request: &ServerSideGetRowsRequest) -> QueryResult<LevelFilters> {
        let inner = &*self.inner;
        let types = SourceTypes(inner.source.as_ref());
        let compiler = PredicateCompiler::new(&inner.columns, &types);

        let mut violations = Violations::new();
        violations.take(self.validate_request(request))?;
        let model = match request.filter_model.as_ref().filter(|_| request.has_filter_model()) {
            Some(payload) => violations.take(inner.recognizer.recognize(payload))?,
            None => None,
        };

        let mut filters = LevelFilters {
            where_predicates: violations
                .take(group_key_predicates(request, &types))?
                .unwrap_or_default(),
            pivot_filters: Vec::new(),
        };

        match self.level_filtering(request, model.as_ref()) {
            LevelFiltering::Suppressed => debug!("filters suppressed above leaf level"),
            LevelFiltering::Aggregated => match &model {
                Some(FilterModel::Columns(entries)) if violations.is_empty() => {
                    let predicate = self.group_agg_predicate(request, entries, &compiler, &types)?;
                    filters.where_predicates.push(predicate);
                }
                _ => {}
            },
            LevelFiltering::Basic => {
                if let Some(payload) = request.external_filter.as_ref().filter(|p| !p.is_null()) {
                    match &inner.external_filter {
                        Some(hook) => filters.where_predicates.extend(hook(payload)),
                        None => debug!("no external filter hook configured, ignoring externalFilter"),
                    }
                }

                if let Some(text) = request.quick_filter.as_deref() {
                    let fields = self.quick_filter_fields(&types);
                    filters
                        .where_predicates
                        .extend(quick_filter_predicate(text, &fields, &inner.quick_filter));
                }

                match model {
                    Some(FilterModel::Advanced(filter)) => {
                        if let Some(predicate) = violations.take(compiler.compile_advanced(&filter))? {
                            filters.where_predicates.push(predicate);
                        }
                    }
                    Some(FilterModel::Columns(entries)) => {
                        for (col_id, filter) in entries {
                            if self.is_pivot_result_name(request, &col_id) {
                                filters.pivot_filters.push((col_id, filter));
                            } else if let Some(predicate) =
                                violations.take(compiler.compile_column(&col_id, &filter))?
                            {
                                filters.where_predicates.push(predicate);
                            }
                        }
                    }
                    None => {}
                }
            }
        }

        violations.finish(filters)
    }

    /// Which filters restrict the rows of the requested level.
    fn level_filtering(
        &self,
        request: &ServerSideGetRowsRequest,
        model: Option<&FilterModel>,
    ) -> LevelFiltering {
        let grid = &self.inner.settings.grid;
        if !request.is_grouping() || request.is_pivoting() {
            return LevelFiltering::Basic;
        }
        let filters_value_col = match model {
            Some(FilterModel::Columns(entries)) => entries
                .iter()
                .any(|(col_id, _)| request.value_cols.iter().any(|v| &v.field == col_id)),
            _ => false,
        };
        if grid.group_agg_filtering && filters_value_col {
            LevelFiltering::Aggregated
        } else if grid.suppresses_group_filters() {
            LevelFiltering::Suppressed
        } else {
            LevelFiltering::Basic
        }
    }

    /// A row belongs to a passing group when a leaf row of its group at the
    /// requested level passes the value column filters, or when the
    /// aggregates of the group it falls in at any level do.
    fn group_agg_predicate(
        &self,
        request: &ServerSideGetRowsRequest,
        entries: &[(String, SimpleFilter)],
        compiler: &PredicateCompiler<'_>,
        types: &dyn FieldTypes,
    ) -> QueryResult<Expr> {
        let inner = &*self.inner;
        let value_filters: Vec<(&ColumnVO, &SimpleFilter)> = request
            .value_cols
            .iter()
            .filter_map(|v| {
                entries
                    .iter()
                    .find(|(col_id, _)| *col_id == v.field)
                    .map(|(_, filter)| (v, filter))
            })
            .collect();

        // Rows sharing the outer row's first `depth` group values.
        let correlated = |alias: &str, depth: usize| {
            request.row_group_cols.iter().take(depth).fold(
                Query::new()
                    .select(vec![lit_int(1)])
                    .from(inner.table.clone().with_alias(alias)),
                |query, group_col| {
                    let own = col(&group_col.field);
                    let outer = table_col(&inner.table.table, &group_col.field);
                    // The blank group correlates with itself.
                    query.filter(
                        own.clone()
                            .eq(outer.clone())
                            .or(own.is_null().and(outer.is_null())),
                    )
                },
            )
        };

        let mut violations = Violations::new();
        let mut leaf = correlated(LEAF_ALIAS, request.group_keys.len() + 1);
        for (value_col, filter) in &value_filters {
            if let Some(predicate) = violations.take(compiler.compile_column(&value_col.field, filter))? {
                leaf = leaf.filter(predicate);
            }
        }
        let leaf = violations.finish(leaf)?;
        let mut passed = vec![exists(leaf)];

        for depth in 1..=request.row_group_cols.len() {
            let keys = request.row_group_cols[..depth]
                .iter()
                .map(|c| col(&c.field))
                .collect();
            let mut groups = correlated(GROUP_ALIAS, depth).group_by(keys);
            for (value_col, filter) in &value_filters {
                let target = FilterTarget::new(
                    format!("filterModel.{}", value_col.field),
                    inner.aggregates.aggregate(value_col)?,
                    types.field_type(&value_col.field),
                );
                groups = groups.having(compiler.compile_simple(
                    &target,
                    filter,
                    inner.columns.filter_for(&value_col.field),
                )?);
            }
            passed.push(exists(groups));
        }
        debug!(levels = passed.len() - 1, "compiled group aggregate filter");
        Ok(disjunction(passed))
    }

    /// Look up pivot values column by column, stopping as soon as the
    /// combinations seen so far pass the ceiling.
    async fn pivot_context(&self, request: &ServerSideGetRowsRequest) -> QueryResult<PivotingContext> {
        let inner = &*self.inner;
        let limit = inner.settings.pivot.max_generated_columns;
        let mut pivot_values = Vec::with_capacity(request.pivot_cols.len());
        let mut combinations = 1usize;
        for pivot_col in &request.pivot_cols {
            let values = inner.source.distinct_values(&pivot_col.field).await?;
            combinations = combinations.saturating_mul(values.len());
            if let Some(limit) = limit.filter(|limit| combinations > *limit) {
                return Err(QueryError::PivotMaxColumnsExceeded {
                    limit,
                    actual: combinations,
                });
            }
            pivot_values.push((pivot_col.field.clone(), values));
        }
        let pivot = PivotingContext::build(
            request,
            pivot_values,
            &inner.aggregates,
            &inner.settings.pivot.separator,
            limit,
        )?;
        debug!(columns = pivot.columns.len(), "built pivot context");
        Ok(pivot)
    }

    /// Filters on generated pivot columns apply to their aggregates.
    fn compile_pivot_filters(
        &self,
        pivot_filters: &[(String, SimpleFilter)],
        pivot: &PivotingContext,
    ) -> QueryResult<Vec<Expr>> {
        let inner = &*self.inner;
        let types = SourceTypes(inner.source.as_ref());
        let compiler = PredicateCompiler::new(&inner.columns, &types);
        let mut having = Vec::with_capacity(pivot_filters.len());
        for (col_id, filter) in pivot_filters {
            let Some(expr) = pivot.expression(col_id) else {
                debug!(col_id = %col_id, "no such pivot column, ignoring its filter");
                continue;
            };
            let field = original_col_name(col_id, pivot.separator());
            let target = FilterTarget::new(
                format!("filterModel.{}", col_id),
                expr.clone(),
                types.field_type(field),
            );
            having.push(compiler.compile_simple(&target, filter, inner.columns.filter_for(field))?);
        }
        Ok(having)
    }

    fn quick_filter_fields(&self, types: &dyn FieldTypes) -> Vec<(String, ScalarType)> {
        match &self.inner.quick_filter.fields {
            Some(fields) => fields
                .iter()
                .map(|f| (f.clone(), types.field_type(f)))
                .collect(),
            None => self
                .inner
                .columns
                .fields()
                .map(|f| (f.to_string(), types.field_type(f)))
                .filter(|(_, ty)| *ty == ScalarType::Text)
                .collect(),
        }
    }
}

fn check_column(
    errors: &mut Vec<ValidationError>,
    columns: &ColumnRegistry,
    path: &str,
    column: &ColumnVO,
    enabled: impl Fn(&ColumnDef) -> bool,
) {
    match columns.get(&column.field) {
        Some(def) if !enabled(def) => errors.push(
            ValidationError::new(path, "is not enabled for this use")
                .with_rejected(Json::from(column.field.as_str())),
        ),
        Some(_) => {}
        None if columns.knows(&column.field) => {}
        None => errors.push(
            ValidationError::new(path, "unknown column")
                .with_rejected(Json::from(column.field.as_str())),
        ),
    }
}
