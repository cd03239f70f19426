//! Query planning stages: grouping, pivoting and ordering.

pub mod grouping;
pub mod pivot;
pub mod sort;

pub use grouping::{group_key_predicates, plan_grouping, AggregateFn, AggregateRegistry, GroupingPlan};
pub use pivot::{cartesian_product, original_col_name, PivotingContext};
pub use sort::{is_auto_group_column, plan_order_by, AUTO_GROUP_COLUMN};
