//! Configuration loading, env substitution, env overrides and validation.
//!
//! Config files: `streamwatch.toml`, `streamwatch.yaml`, or `streamwatch.json`
//! Searched in `./` then `~/.config/streamwatch/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, data_dir, discover_and_load, load_config},
    schema::{
        DiscordConfig, GroupConfig, MonitorConfig, Route, RouteTable, StreamwatchConfig,
        TwitchConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_file},
};
