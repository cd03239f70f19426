//! Filter models, their recognition from JSON payloads and their
//! compilation into SQL predicates.

pub mod advanced;
pub mod compile;
pub mod params;
pub mod quick;
pub mod recognize;
pub mod simple;

pub use advanced::{
    AdvancedCondition, AdvancedFilter, BooleanAdvancedType, ScalarAdvancedType, TextAdvancedType,
};
pub use compile::{FieldTypes, FilterTarget, PredicateCompiler};
pub use params::{
    ColumnFilter, DateFilterParams, ScalarFilterParams, SetFilterParams, TextFilterParams,
    TextFormatter, TextMatcher, TextMatcherParams,
};
pub use quick::{quick_filter_predicate, QuickFilterMatcher, QuickFilterParams, QuickFilterParser};
pub use recognize::{AdvancedRecognizer, FilterRecognizer, SimpleRecognizer};
pub use simple::{
    DateFilterModel, NumberFilterModel, SetFilterModel, SimpleFilter, SimpleFilterType,
    TextFilterModel,
};

use std::fmt;
use std::str::FromStr;

/// Boolean combinator for combined conditions and advanced joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinOperator {
    And,
    Or,
}

impl FromStr for JoinOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(JoinOperator::And),
            "OR" => Ok(JoinOperator::Or),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinOperator::And => write!(f, "AND"),
            JoinOperator::Or => write!(f, "OR"),
        }
    }
}

/// A whole `filterModel` after recognition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterModel {
    /// Column-keyed filters, ordered by column id.
    Columns(Vec<(String, SimpleFilter)>),
    Advanced(AdvancedFilter),
}

impl FilterModel {
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterModel::Columns(entries) if entries.is_empty())
    }
}
