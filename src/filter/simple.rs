//! Column-keyed filter models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::JoinOperator;

/// Operator carried in the `type` field of a scalar filter model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleFilterType {
    Empty,
    Equals,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    InRange,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Blank,
    NotBlank,
}

impl SimpleFilterType {
    pub const ALL: [SimpleFilterType; 14] = [
        SimpleFilterType::Empty,
        SimpleFilterType::Equals,
        SimpleFilterType::NotEqual,
        SimpleFilterType::LessThan,
        SimpleFilterType::LessThanOrEqual,
        SimpleFilterType::GreaterThan,
        SimpleFilterType::GreaterThanOrEqual,
        SimpleFilterType::InRange,
        SimpleFilterType::Contains,
        SimpleFilterType::NotContains,
        SimpleFilterType::StartsWith,
        SimpleFilterType::EndsWith,
        SimpleFilterType::Blank,
        SimpleFilterType::NotBlank,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SimpleFilterType::Empty => "empty",
            SimpleFilterType::Equals => "equals",
            SimpleFilterType::NotEqual => "notEqual",
            SimpleFilterType::LessThan => "lessThan",
            SimpleFilterType::LessThanOrEqual => "lessThanOrEqual",
            SimpleFilterType::GreaterThan => "greaterThan",
            SimpleFilterType::GreaterThanOrEqual => "greaterThanOrEqual",
            SimpleFilterType::InRange => "inRange",
            SimpleFilterType::Contains => "contains",
            SimpleFilterType::NotContains => "notContains",
            SimpleFilterType::StartsWith => "startsWith",
            SimpleFilterType::EndsWith => "endsWith",
            SimpleFilterType::Blank => "blank",
            SimpleFilterType::NotBlank => "notBlank",
        }
    }

    /// Operators that compare against no literal at all.
    pub fn is_nullary(self) -> bool {
        matches!(
            self,
            SimpleFilterType::Empty | SimpleFilterType::Blank | SimpleFilterType::NotBlank
        )
    }
}

impl FromStr for SimpleFilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SimpleFilterType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for SimpleFilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFilterModel {
    pub kind: SimpleFilterType,
    pub filter: Option<String>,
    pub filter_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberFilterModel {
    pub kind: SimpleFilterType,
    pub filter: Option<Decimal>,
    pub filter_to: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateFilterModel {
    pub kind: SimpleFilterType,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
}

/// Selected set members. `None` stands for the blank entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetFilterModel {
    pub values: Vec<Option<String>>,
}

/// A recognized column filter.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleFilter {
    Text(TextFilterModel),
    Number(NumberFilterModel),
    Date(DateFilterModel),
    Set(SetFilterModel),
    /// One optional model per child filter of a multi filter, by position.
    Multi(Vec<Option<SimpleFilter>>),
    /// Two or more conditions of the same scalar family.
    Combined {
        operator: JoinOperator,
        conditions: Vec<SimpleFilter>,
    },
}

impl SimpleFilter {
    /// The `filterType` this model was recognized from.
    pub fn filter_type(&self) -> &'static str {
        match self {
            SimpleFilter::Text(_) => "text",
            SimpleFilter::Number(_) => "number",
            SimpleFilter::Date(_) => "date",
            SimpleFilter::Set(_) => "set",
            SimpleFilter::Multi(_) => "multi",
            SimpleFilter::Combined { conditions, .. } => conditions
                .first()
                .map(SimpleFilter::filter_type)
                .unwrap_or("text"),
        }
    }
}
