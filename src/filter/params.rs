//! Per-column filter configuration.
//!
//! These are immutable after construction and shared between requests.

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use super::simple::SimpleFilterType;
use crate::sql::Expr;

/// Rewrites a text expression before comparison, applied to both sides.
pub type TextFormatter = Arc<dyn Fn(Expr) -> Expr + Send + Sync>;

/// Replaces all built-in text predicate generation.
pub type TextMatcher = Arc<dyn Fn(&TextMatcherParams) -> Expr + Send + Sync>;

/// Inputs handed to a [`TextMatcher`].
#[derive(Debug, Clone)]
pub struct TextMatcherParams {
    pub filter_option: SimpleFilterType,
    /// The column value, after trimming and formatting.
    pub value: Expr,
    /// The filter literal, after trimming and formatting. `None` for blank
    /// checks.
    pub filter_text: Option<Expr>,
}

#[derive(Clone)]
pub struct TextFilterParams {
    pub case_sensitive: bool,
    pub trim_input: bool,
    pub filter_options: Vec<SimpleFilterType>,
    pub text_formatter: Option<TextFormatter>,
    pub text_matcher: Option<TextMatcher>,
}

impl Default for TextFilterParams {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            trim_input: false,
            filter_options: SimpleFilterType::ALL.to_vec(),
            text_formatter: None,
            text_matcher: None,
        }
    }
}

impl TextFilterParams {
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn trim_input(mut self, trim_input: bool) -> Self {
        self.trim_input = trim_input;
        self
    }

    pub fn filter_options(mut self, options: Vec<SimpleFilterType>) -> Self {
        self.filter_options = options;
        self
    }

    pub fn text_formatter(mut self, f: impl Fn(Expr) -> Expr + Send + Sync + 'static) -> Self {
        self.text_formatter = Some(Arc::new(f));
        self
    }

    pub fn text_matcher(
        mut self,
        f: impl Fn(&TextMatcherParams) -> Expr + Send + Sync + 'static,
    ) -> Self {
        self.text_matcher = Some(Arc::new(f));
        self
    }

    pub fn allows(&self, option: SimpleFilterType) -> bool {
        self.filter_options.contains(&option)
    }
}

impl fmt::Debug for TextFilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextFilterParams")
            .field("case_sensitive", &self.case_sensitive)
            .field("trim_input", &self.trim_input)
            .field("filter_options", &self.filter_options)
            .field("text_formatter", &self.text_formatter.is_some())
            .field("text_matcher", &self.text_matcher.is_some())
            .finish()
    }
}

/// Options shared by number and date filters.
#[derive(Debug, Clone)]
pub struct ScalarFilterParams {
    pub filter_options: Vec<SimpleFilterType>,
    pub in_range_inclusive: bool,
    pub include_blanks_in_equals: bool,
    pub include_blanks_in_not_equal: bool,
    /// Covers both `lessThan` and `lessThanOrEqual`.
    pub include_blanks_in_less_than: bool,
    /// Covers both `greaterThan` and `greaterThanOrEqual`.
    pub include_blanks_in_greater_than: bool,
    pub include_blanks_in_range: bool,
}

impl Default for ScalarFilterParams {
    fn default() -> Self {
        Self {
            filter_options: SimpleFilterType::ALL.to_vec(),
            in_range_inclusive: false,
            include_blanks_in_equals: false,
            include_blanks_in_not_equal: false,
            include_blanks_in_less_than: false,
            include_blanks_in_greater_than: false,
            include_blanks_in_range: false,
        }
    }
}

impl ScalarFilterParams {
    pub fn in_range_inclusive(mut self, inclusive: bool) -> Self {
        self.in_range_inclusive = inclusive;
        self
    }

    pub fn include_blanks_in_equals(mut self, include: bool) -> Self {
        self.include_blanks_in_equals = include;
        self
    }

    pub fn include_blanks_in_not_equal(mut self, include: bool) -> Self {
        self.include_blanks_in_not_equal = include;
        self
    }

    pub fn include_blanks_in_less_than(mut self, include: bool) -> Self {
        self.include_blanks_in_less_than = include;
        self
    }

    pub fn include_blanks_in_greater_than(mut self, include: bool) -> Self {
        self.include_blanks_in_greater_than = include;
        self
    }

    pub fn include_blanks_in_range(mut self, include: bool) -> Self {
        self.include_blanks_in_range = include;
        self
    }

    pub fn filter_options(mut self, options: Vec<SimpleFilterType>) -> Self {
        self.filter_options = options;
        self
    }

    pub fn allows(&self, option: SimpleFilterType) -> bool {
        self.filter_options.contains(&option)
    }

    /// Whether blanks are ORed into the predicate for this operator.
    pub fn includes_blanks(&self, option: SimpleFilterType) -> bool {
        match option {
            SimpleFilterType::Equals => self.include_blanks_in_equals,
            SimpleFilterType::NotEqual => self.include_blanks_in_not_equal,
            SimpleFilterType::LessThan | SimpleFilterType::LessThanOrEqual => {
                self.include_blanks_in_less_than
            }
            SimpleFilterType::GreaterThan | SimpleFilterType::GreaterThanOrEqual => {
                self.include_blanks_in_greater_than
            }
            SimpleFilterType::InRange => self.include_blanks_in_range,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DateFilterParams {
    pub scalar: ScalarFilterParams,
    pub min_valid_year: Option<i32>,
    pub max_valid_year: Option<i32>,
    pub min_valid_date: Option<NaiveDate>,
    pub max_valid_date: Option<NaiveDate>,
}

impl Default for DateFilterParams {
    fn default() -> Self {
        Self {
            scalar: ScalarFilterParams::default(),
            min_valid_year: Some(1000),
            max_valid_year: None,
            min_valid_date: None,
            max_valid_date: None,
        }
    }
}

impl DateFilterParams {
    pub fn scalar(mut self, scalar: ScalarFilterParams) -> Self {
        self.scalar = scalar;
        self
    }

    pub fn min_valid_year(mut self, year: i32) -> Self {
        self.min_valid_year = Some(year);
        self
    }

    pub fn max_valid_year(mut self, year: i32) -> Self {
        self.max_valid_year = Some(year);
        self
    }

    pub fn min_valid_date(mut self, date: NaiveDate) -> Self {
        self.min_valid_date = Some(date);
        self
    }

    pub fn max_valid_date(mut self, date: NaiveDate) -> Self {
        self.max_valid_date = Some(date);
        self
    }

    /// Check a filter date against the configured bounds.
    pub fn check_bounds(&self, date: NaiveDate) -> Result<(), String> {
        if let Some(max) = self.max_valid_year {
            if date.year() > max {
                return Err(format!("Date {} is after the maximum valid year {}", date, max));
            }
        }
        if let Some(min) = self.min_valid_year {
            if date.year() < min {
                return Err(format!("Date {} is before the minimum valid year {}", date, min));
            }
        }
        if let Some(max) = self.max_valid_date {
            if date > max {
                return Err(format!("Date {} is after the maximum valid date {}", date, max));
            }
        }
        if let Some(min) = self.min_valid_date {
            if date < min {
                return Err(format!("Date {} is before the minimum valid date {}", date, min));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SetFilterParams {
    pub case_sensitive: bool,
    pub text_formatter: Option<TextFormatter>,
}

impl Default for SetFilterParams {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            text_formatter: None,
        }
    }
}

impl SetFilterParams {
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn text_formatter(mut self, f: impl Fn(Expr) -> Expr + Send + Sync + 'static) -> Self {
        self.text_formatter = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for SetFilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetFilterParams")
            .field("case_sensitive", &self.case_sensitive)
            .field("text_formatter", &self.text_formatter.is_some())
            .finish()
    }
}

/// The filter a column is configured with.
#[derive(Debug, Clone)]
pub enum ColumnFilter {
    Text(TextFilterParams),
    Number(ScalarFilterParams),
    Date(DateFilterParams),
    Set(SetFilterParams),
    /// Child filters, matched by position against `filterModels`.
    Multi(Vec<ColumnFilter>),
}

impl ColumnFilter {
    pub fn text() -> Self {
        ColumnFilter::Text(TextFilterParams::default())
    }

    pub fn number() -> Self {
        ColumnFilter::Number(ScalarFilterParams::default())
    }

    pub fn date() -> Self {
        ColumnFilter::Date(DateFilterParams::default())
    }

    pub fn set() -> Self {
        ColumnFilter::Set(SetFilterParams::default())
    }

    pub fn text_params(&self) -> Option<&TextFilterParams> {
        match self {
            ColumnFilter::Text(p) => Some(p),
            ColumnFilter::Multi(children) => children.iter().find_map(ColumnFilter::text_params),
            _ => None,
        }
    }

    pub fn number_params(&self) -> Option<&ScalarFilterParams> {
        match self {
            ColumnFilter::Number(p) => Some(p),
            ColumnFilter::Multi(children) => children.iter().find_map(ColumnFilter::number_params),
            _ => None,
        }
    }

    pub fn date_params(&self) -> Option<&DateFilterParams> {
        match self {
            ColumnFilter::Date(p) => Some(p),
            ColumnFilter::Multi(children) => children.iter().find_map(ColumnFilter::date_params),
            _ => None,
        }
    }

    pub fn set_params(&self) -> Option<&SetFilterParams> {
        match self {
            ColumnFilter::Set(p) => Some(p),
            ColumnFilter::Multi(children) => children.iter().find_map(ColumnFilter::set_params),
            _ => None,
        }
    }
}
