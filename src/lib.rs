//! # gridquery
//!
//! Compiles server-side row model requests from a data grid into SQL query
//! plans and runs them against a pluggable data source.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        ServerSideGetRowsRequest (grid JSON payload)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [filter::recognize]
//! ┌─────────────────────────────────────────────────────────┐
//! │        FilterModel (simple or advanced filter trees)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [filter::compile, sync, plan]
//! ┌─────────────────────────────────────────────────────────┐
//! │   sql::Query (select, where, group by, having, order)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [source::DataSource]
//! ┌─────────────────────────────────────────────────────────┐
//! │          ResultSet  ──[mapper]──>  LoadSuccessParams     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod model;
pub mod plan;
pub mod source;
pub mod sql;
pub mod sync;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::builder::{ExternalFilterHook, QueryBuilder, QueryBuilderConfig};
    pub use crate::config::Settings;
    pub use crate::error::{QueryError, QueryResult, ValidationError};
    pub use crate::filter::{
        ColumnFilter, DateFilterParams, FilterRecognizer, QuickFilterParams, ScalarFilterParams,
        SetFilterParams, SimpleFilter, TextFilterParams,
    };
    pub use crate::model::{
        ColumnDef, ColumnVO, LoadSuccessParams, ScalarType, ServerSideGetRowsRequest,
        SortModelItem, Value,
    };
    pub use crate::source::{DataSource, DataSourceError, MemoryDataSource, ResultSet};
    pub use crate::sql::{col, Dialect, Expr, ExprExt, Query};
}

pub use builder::QueryBuilder;
pub use error::{QueryError, QueryResult};
pub use sql::Dialect;
