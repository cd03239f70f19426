//! Request, response and column model types.

pub mod column;
pub mod request;
pub mod response;
pub mod value;

pub use column::{ColumnDef, ColumnRegistry};
pub use request::{ColumnVO, ServerSideGetRowsRequest, SortDirection, SortModelItem};
pub use response::LoadSuccessParams;
pub use value::{ScalarType, Value};
