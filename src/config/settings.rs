//! TOML-based configuration for gridquery.
//!
//! Supports a config file (gridquery.toml) with environment variable expansion
//! in the table name.
//!
//! A full file, every key optional:
//! ```toml
//! dialect = "postgres"
//! table = "${SALES_SCHEMA}.sales"
//!
//! [pivot]
//! separator = "_"
//! max_generated_columns = 500
//!
//! [grid]
//! paginate_child_rows = false
//! suppress_field_dot_notation = false
//! group_agg_filtering = false
//! suppress_agg_filtered_only = false
//! enable_advanced_filter = false
//! get_child_count = false
//! child_count_field_name = "childCount"
//! ```

use std::borrow::Cow;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::sql::Dialect;

/// Overrides the config file search.
pub const CONFIG_ENV: &str = "GRIDQUERY_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no config file at {0}")]
    FileNotFound(PathBuf),

    #[error("could not read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("invalid setting: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// SQL dialect the compiled plan is rendered in.
    pub dialect: Dialect,

    /// Source table, optionally `schema.table`. May reference env vars.
    pub table: Option<String>,

    /// Pivot column generation.
    pub pivot: PivotSettings,

    /// Grid behaviour switches.
    pub grid: GridSettings,
}

/// Pivot column generation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PivotSettings {
    /// Joins pivot values and the value field into a generated column name.
    pub separator: String,

    /// Ceiling on generated pivot columns. Unlimited when absent.
    pub max_generated_columns: Option<usize>,
}

impl Default for PivotSettings {
    fn default() -> Self {
        Self {
            separator: "_".into(),
            max_generated_columns: None,
        }
    }
}

/// Grid behaviour settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridSettings {
    /// Count the next unexpanded level instead of the root level.
    pub paginate_child_rows: bool,

    /// Keep dotted aliases flat in result rows.
    pub suppress_field_dot_notation: bool,

    /// A group row passes a value column filter when its aggregate, or any
    /// aggregate or leaf beneath it, does. Implies
    /// `suppress_agg_filtered_only`.
    pub group_agg_filtering: bool,

    /// Group levels ignore filters; they only apply once leaf rows are
    /// fetched.
    pub suppress_agg_filtered_only: bool,

    /// Accept the boolean-tree filter payload.
    pub enable_advanced_filter: bool,

    /// Emit `COUNT(*)` for every group row.
    pub get_child_count: bool,

    pub child_count_field_name: String,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            paginate_child_rows: false,
            suppress_field_dot_notation: false,
            group_agg_filtering: false,
            suppress_agg_filtered_only: false,
            enable_advanced_filter: false,
            get_child_count: false,
            child_count_field_name: "childCount".into(),
        }
    }
}

impl GridSettings {
    /// Whether filters are left out of group level queries.
    pub fn suppresses_group_filters(&self) -> bool {
        self.group_agg_filtering || self.suppress_agg_filtered_only
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// First of `$GRIDQUERY_CONFIG`, `./gridquery.toml` and
    /// `<config dir>/gridquery/config.toml`; defaults when none exist.
    pub fn load() -> Result<Self, SettingsError> {
        if let Some(explicit) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(explicit));
        }
        let user = dirs::config_dir().map(|dir| dir.join("gridquery").join("config.toml"));
        let found = std::iter::once(PathBuf::from("gridquery.toml"))
            .chain(user)
            .find(|candidate| candidate.is_file());
        match found {
            Some(path) => Self::from_file(path),
            None => Ok(Settings::default()),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.pivot.separator.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "pivot.separator must not be empty".into(),
            ));
        }
        if self.pivot.max_generated_columns == Some(0) {
            return Err(SettingsError::InvalidConfig(
                "pivot.max_generated_columns must be at least 1".into(),
            ));
        }
        if self.grid.child_count_field_name.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "grid.child_count_field_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Table name with environment variables expanded.
    pub fn resolved_table(&self) -> Result<Option<String>, SettingsError> {
        self.table.as_deref().map(expand_env_vars).transpose()
    }
}

static ENV_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z0-9_]+)").expect("static regex")
});

/// Substitute `${VAR}` and `$VAR` references. A `$` not followed by a name
/// is kept as is.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut missing = None;
    let expanded = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        match env::var(name) {
            Ok(value) => Cow::Owned(value),
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                Cow::Borrowed("")
            }
        }
    });
    match missing {
        Some(name) => Err(SettingsError::MissingEnvVar(name)),
        None => Ok(expanded.into_owned()),
    }
}
