//! Configuration module for gridquery.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{expand_env_vars, CONFIG_ENV, GridSettings, PivotSettings, Settings, SettingsError};
