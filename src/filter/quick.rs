//! Quick filter: free-text search across a set of columns.

use std::fmt;
use std::sync::Arc;

use super::compile::like_pattern;
use super::params::TextFormatter;
use crate::model::ScalarType;
use crate::sql::{cast, col, conjunction, disjunction, lit_str, lower, CastType, Expr, ExprExt};

/// Splits the quick filter text into words.
pub type QuickFilterParser = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Replaces the built-in matching. Receives the prepared words and the
/// prepared field expressions.
pub type QuickFilterMatcher = Arc<dyn Fn(&[Expr], &[Expr]) -> Expr + Send + Sync>;

#[derive(Clone, Default)]
pub struct QuickFilterParams {
    /// Searched fields. Defaults to every text column in the column defs.
    pub fields: Option<Vec<String>>,
    pub case_sensitive: bool,
    pub trim_input: bool,
    pub text_formatter: Option<TextFormatter>,
    pub parser: Option<QuickFilterParser>,
    pub matcher: Option<QuickFilterMatcher>,
}

impl QuickFilterParams {
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn trim_input(mut self, trim_input: bool) -> Self {
        self.trim_input = trim_input;
        self
    }

    pub fn text_formatter(mut self, f: impl Fn(Expr) -> Expr + Send + Sync + 'static) -> Self {
        self.text_formatter = Some(Arc::new(f));
        self
    }

    pub fn parser(mut self, f: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.parser = Some(Arc::new(f));
        self
    }

    pub fn matcher(mut self, f: impl Fn(&[Expr], &[Expr]) -> Expr + Send + Sync + 'static) -> Self {
        self.matcher = Some(Arc::new(f));
        self
    }

    fn prepare(&self, expr: Expr) -> Expr {
        match &self.text_formatter {
            Some(format) => format(expr),
            None if !self.case_sensitive => lower(expr),
            None => expr,
        }
    }

    fn prepare_word(&self, word: &str) -> Expr {
        match &self.text_formatter {
            Some(format) => format(lit_str(word)),
            None if !self.case_sensitive => lit_str(&word.to_lowercase()),
            None => lit_str(word),
        }
    }
}

impl fmt::Debug for QuickFilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickFilterParams")
            .field("fields", &self.fields)
            .field("case_sensitive", &self.case_sensitive)
            .field("trim_input", &self.trim_input)
            .field("text_formatter", &self.text_formatter.is_some())
            .field("parser", &self.parser.is_some())
            .field("matcher", &self.matcher.is_some())
            .finish()
    }
}

/// Every word must appear in at least one field. Returns `None` when the
/// text holds no words.
pub fn quick_filter_predicate(
    text: &str,
    fields: &[(String, ScalarType)],
    params: &QuickFilterParams,
) -> Option<Expr> {
    let words: Vec<String> = match &params.parser {
        Some(parse) => parse(text),
        None => text.split_whitespace().map(String::from).collect(),
    };
    let words: Vec<Expr> = words
        .iter()
        .map(|w| if params.trim_input { w.trim() } else { w.as_str() })
        .filter(|w| !w.is_empty())
        .map(|w| params.prepare_word(w))
        .collect();
    if words.is_empty() {
        return None;
    }

    let columns: Vec<Expr> = fields
        .iter()
        .map(|(field, ty)| {
            let expr = match ty {
                ScalarType::Text | ScalarType::Other => col(field),
                _ => cast(col(field), CastType::Text),
            };
            params.prepare(expr)
        })
        .collect();

    if let Some(matcher) = &params.matcher {
        return Some(matcher(&words, &columns));
    }

    let per_word = words
        .into_iter()
        .map(|word| {
            let pattern = like_pattern(word, true, true);
            disjunction(
                columns
                    .iter()
                    .map(|c| c.clone().like_escape(pattern.clone(), '\\'))
                    .collect(),
            )
        })
        .collect();
    Some(conjunction(per_word))
}
