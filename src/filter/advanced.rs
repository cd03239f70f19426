//! Boolean-tree filter models produced by the advanced filter builder.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::simple::SimpleFilterType;
use super::JoinOperator;

/// Operators available to number and date conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarAdvancedType {
    Equals,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Blank,
    NotBlank,
}

/// Operators available to text and object conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextAdvancedType {
    Equals,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Blank,
    NotBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanAdvancedType {
    True,
    False,
    Blank,
    NotBlank,
}

impl From<ScalarAdvancedType> for SimpleFilterType {
    fn from(t: ScalarAdvancedType) -> Self {
        match t {
            ScalarAdvancedType::Equals => SimpleFilterType::Equals,
            ScalarAdvancedType::NotEqual => SimpleFilterType::NotEqual,
            ScalarAdvancedType::LessThan => SimpleFilterType::LessThan,
            ScalarAdvancedType::LessThanOrEqual => SimpleFilterType::LessThanOrEqual,
            ScalarAdvancedType::GreaterThan => SimpleFilterType::GreaterThan,
            ScalarAdvancedType::GreaterThanOrEqual => SimpleFilterType::GreaterThanOrEqual,
            ScalarAdvancedType::Blank => SimpleFilterType::Blank,
            ScalarAdvancedType::NotBlank => SimpleFilterType::NotBlank,
        }
    }
}

impl From<TextAdvancedType> for SimpleFilterType {
    fn from(t: TextAdvancedType) -> Self {
        match t {
            TextAdvancedType::Equals => SimpleFilterType::Equals,
            TextAdvancedType::NotEqual => SimpleFilterType::NotEqual,
            TextAdvancedType::Contains => SimpleFilterType::Contains,
            TextAdvancedType::NotContains => SimpleFilterType::NotContains,
            TextAdvancedType::StartsWith => SimpleFilterType::StartsWith,
            TextAdvancedType::EndsWith => SimpleFilterType::EndsWith,
            TextAdvancedType::Blank => SimpleFilterType::Blank,
            TextAdvancedType::NotBlank => SimpleFilterType::NotBlank,
        }
    }
}

impl FromStr for ScalarAdvancedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(ScalarAdvancedType::Equals),
            "notEqual" => Ok(ScalarAdvancedType::NotEqual),
            "lessThan" => Ok(ScalarAdvancedType::LessThan),
            "lessThanOrEqual" => Ok(ScalarAdvancedType::LessThanOrEqual),
            "greaterThan" => Ok(ScalarAdvancedType::GreaterThan),
            "greaterThanOrEqual" => Ok(ScalarAdvancedType::GreaterThanOrEqual),
            "blank" => Ok(ScalarAdvancedType::Blank),
            "notBlank" => Ok(ScalarAdvancedType::NotBlank),
            other => Err(other.to_string()),
        }
    }
}

impl FromStr for TextAdvancedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(TextAdvancedType::Equals),
            "notEqual" => Ok(TextAdvancedType::NotEqual),
            "contains" => Ok(TextAdvancedType::Contains),
            "notContains" => Ok(TextAdvancedType::NotContains),
            "startsWith" => Ok(TextAdvancedType::StartsWith),
            "endsWith" => Ok(TextAdvancedType::EndsWith),
            "blank" => Ok(TextAdvancedType::Blank),
            "notBlank" => Ok(TextAdvancedType::NotBlank),
            other => Err(other.to_string()),
        }
    }
}

impl FromStr for BooleanAdvancedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blank" => Ok(BooleanAdvancedType::Blank),
            "notBlank" => Ok(BooleanAdvancedType::NotBlank),
            other if other.eq_ignore_ascii_case("true") => Ok(BooleanAdvancedType::True),
            other if other.eq_ignore_ascii_case("false") => Ok(BooleanAdvancedType::False),
            other => Err(other.to_string()),
        }
    }
}

/// The typed condition of a single advanced column filter.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvancedCondition {
    Text {
        kind: TextAdvancedType,
        filter: Option<String>,
    },
    Object {
        kind: TextAdvancedType,
        filter: Option<String>,
    },
    Number {
        kind: ScalarAdvancedType,
        filter: Option<Decimal>,
    },
    Date {
        kind: ScalarAdvancedType,
        filter: Option<NaiveDate>,
    },
    DateString {
        kind: ScalarAdvancedType,
        filter: Option<NaiveDate>,
    },
    Boolean {
        kind: BooleanAdvancedType,
    },
}

impl AdvancedCondition {
    pub fn filter_type(&self) -> &'static str {
        match self {
            AdvancedCondition::Text { .. } => "text",
            AdvancedCondition::Object { .. } => "object",
            AdvancedCondition::Number { .. } => "number",
            AdvancedCondition::Date { .. } => "date",
            AdvancedCondition::DateString { .. } => "dateString",
            AdvancedCondition::Boolean { .. } => "boolean",
        }
    }
}

/// A node of the advanced filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvancedFilter {
    Column {
        col_id: String,
        condition: AdvancedCondition,
    },
    Join {
        operator: JoinOperator,
        conditions: Vec<AdvancedFilter>,
    },
}

impl AdvancedFilter {
    /// Every column id referenced anywhere in the tree, depth first.
    pub fn column_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_column_ids(&mut ids);
        ids
    }

    fn collect_column_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            AdvancedFilter::Column { col_id, .. } => out.push(col_id),
            AdvancedFilter::Join { conditions, .. } => {
                for c in conditions {
                    c.collect_column_ids(out);
                }
            }
        }
    }
}
