//! Server-side column definitions.

use std::collections::HashMap;

use crate::filter::ColumnFilter;

/// What the server allows a grid column to do.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub field: String,
    /// `None` disables filtering on this column.
    pub filter: Option<ColumnFilter>,
    pub enable_row_group: bool,
    pub enable_value: bool,
    pub enable_pivot: bool,
    /// Restricts which aggregate functions may be applied. `None` allows all.
    pub allowed_agg_funcs: Option<Vec<String>>,
    pub sortable: bool,
}

impl ColumnDef {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.into(),
            filter: None,
            enable_row_group: true,
            enable_value: true,
            enable_pivot: true,
            allowed_agg_funcs: None,
            sortable: true,
        }
    }

    pub fn filter(mut self, filter: ColumnFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn enable_row_group(mut self, enable: bool) -> Self {
        self.enable_row_group = enable;
        self
    }

    pub fn enable_value(mut self, enable: bool) -> Self {
        self.enable_value = enable;
        self
    }

    pub fn enable_pivot(mut self, enable: bool) -> Self {
        self.enable_pivot = enable;
        self
    }

    pub fn allowed_agg_funcs(mut self, funcs: &[&str]) -> Self {
        self.allowed_agg_funcs = Some(funcs.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn allows_agg_func(&self, name: &str) -> bool {
        self.allowed_agg_funcs
            .as_ref()
            .map_or(true, |funcs| funcs.iter().any(|f| f == name))
    }
}

/// Column definitions keyed by field, in registration order.
///
/// An empty registry is permissive: every field is accepted and filters
/// use default parameters.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    defs: Vec<ColumnDef>,
    index: HashMap<String, usize>,
}

impl ColumnRegistry {
    pub fn new(defs: Vec<ColumnDef>) -> Self {
        let mut registry = Self::default();
        for def in defs {
            registry.insert(def);
        }
        registry
    }

    /// Add or replace a definition.
    pub fn insert(&mut self, def: ColumnDef) {
        match self.index.get(&def.field) {
            Some(&i) => self.defs[i] = def,
            None => {
                self.index.insert(def.field.clone(), self.defs.len());
                self.defs.push(def);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&ColumnDef> {
        self.index.get(field).map(|&i| &self.defs[i])
    }

    /// Whether the field may be referenced by a request.
    pub fn knows(&self, field: &str) -> bool {
        self.is_empty() || self.index.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.defs.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|d| d.field.as_str())
    }

    /// Filter configured for a field. `None` means defaults apply.
    pub fn filter_for(&self, field: &str) -> Option<&ColumnFilter> {
        self.get(field).and_then(|d| d.filter.as_ref())
    }
}
