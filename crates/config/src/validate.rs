//! Configuration validation.
//!
//! Detects unknown/misspelled fields in the raw file, then checks the parsed
//! config for missing credentials, unusable timings and routing mistakes.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use {secrecy::ExposeSecret, streamwatch_common::Identity};

use crate::{loader::load_config_value, schema::StreamwatchConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "credentials", "timing", "routing"
    pub category: &'static str,
    /// Dotted path, e.g. "monitor.grace_misses"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Expected shape of the configuration file.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// A map with dynamic keys whose values have a known shape.
    Map(Box<KnownKeys>),
    /// Scalar or list value: stop recursion.
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Map, Struct};

    Struct(HashMap::from([
        (
            "twitch",
            Struct(HashMap::from([
                ("client_id", Leaf),
                ("client_secret", Leaf),
                ("api_base_url", Leaf),
                ("auth_base_url", Leaf),
            ])),
        ),
        (
            "discord",
            Struct(HashMap::from([("token", Leaf), ("api_base_url", Leaf)])),
        ),
        (
            "monitor",
            Struct(HashMap::from([
                ("poll_interval_secs", Leaf),
                ("grace_misses", Leaf),
                ("request_timeout_secs", Leaf),
                ("cache_path", Leaf),
            ])),
        ),
        (
            "groups",
            Map(Box::new(Struct(HashMap::from([
                ("destination", Leaf),
                ("channels", Leaf),
            ])))),
        ),
    ]))
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    result: &mut ValidationResult,
) {
    let Some(object) = value.as_object() else {
        return;
    };
    for (key, child) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match schema {
            KnownKeys::Struct(fields) => match fields.get(key.as_str()) {
                Some(child_schema) => check_unknown_fields(child, child_schema, &path, result),
                None => result.push(
                    Severity::Warning,
                    "unknown-field",
                    path,
                    format!("unknown field `{key}`"),
                ),
            },
            KnownKeys::Map(value_schema) => {
                check_unknown_fields(child, value_schema, &path, result);
            },
            KnownKeys::Leaf => {},
        }
    }
}

// ── Entry points ────────────────────────────────────────────────────────────

/// Validate a config file on disk: syntax, unknown fields, then semantics.
pub fn validate_file(path: &Path) -> ValidationResult {
    let mut result = ValidationResult::default();

    match load_config_value(path) {
        Ok(value) => check_unknown_fields(&value, &build_schema_map(), "", &mut result),
        Err(e) => {
            result.push(Severity::Error, "syntax", path.display().to_string(), e.to_string());
            return result;
        },
    }

    match crate::loader::load_config(path) {
        Ok(mut config) => {
            crate::loader::apply_env_overrides(&mut config);
            result.diagnostics.extend(validate(&config).diagnostics);
        },
        Err(e) => result.push(Severity::Error, "syntax", path.display().to_string(), e.to_string()),
    }
    result
}

/// Semantic checks on a parsed config.
pub fn validate(config: &StreamwatchConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.twitch.client_id.trim().is_empty() {
        result.push(
            Severity::Error,
            "credentials",
            "twitch.client_id",
            "missing (set it or TWITCH_CLIENT_ID)",
        );
    }
    if config.twitch.client_secret.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "credentials",
            "twitch.client_secret",
            "missing (set it or TWITCH_CLIENT_SECRET)",
        );
    }
    if config.discord.token.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "credentials",
            "discord.token",
            "missing (set it or DISCORD_TOKEN)",
        );
    }

    let monitor = &config.monitor;
    if monitor.poll_interval_secs == 0 {
        result.push(
            Severity::Error,
            "timing",
            "monitor.poll_interval_secs",
            "must be greater than zero",
        );
    } else if monitor.poll_interval_secs < 30 {
        result.push(
            Severity::Warning,
            "timing",
            "monitor.poll_interval_secs",
            "intervals under 30s risk provider rate limits",
        );
    }
    if monitor.grace_misses == 0 {
        result.push(
            Severity::Error,
            "timing",
            "monitor.grace_misses",
            "must be at least 1",
        );
    }
    if monitor.request_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "timing",
            "monitor.request_timeout_secs",
            "must be greater than zero",
        );
    } else if monitor.poll_interval_secs > 0
        && monitor.request_timeout_secs >= monitor.poll_interval_secs
    {
        result.push(
            Severity::Warning,
            "timing",
            "monitor.request_timeout_secs",
            "timeout is not shorter than the poll interval",
        );
    }

    check_groups(config, &mut result);
    result
}

fn check_groups(config: &StreamwatchConfig, result: &mut ValidationResult) {
    if config.groups.is_empty() {
        result.push(
            Severity::Warning,
            "routing",
            "groups",
            "no groups configured, nothing will be watched",
        );
        return;
    }

    let mut seen: HashMap<Identity, &str> = HashMap::new();
    for (tag, group) in &config.groups {
        let path = format!("groups.{tag}");
        if group.destination().is_none() {
            result.push(
                Severity::Warning,
                "routing",
                format!("{path}.destination"),
                "no destination, channels in this group are skipped",
            );
        }
        if group.channels.is_empty() {
            result.push(
                Severity::Warning,
                "routing",
                format!("{path}.channels"),
                "group lists no channels",
            );
        }

        let mut in_group = HashSet::new();
        for raw in &group.channels {
            let identity = match Identity::new(raw) {
                Ok(identity) => identity,
                Err(e) => {
                    result.push(Severity::Error, "routing", format!("{path}.channels"), e.to_string());
                    continue;
                },
            };
            if !in_group.insert(identity.clone()) {
                continue;
            }
            if let Some(first) = seen.get(&identity) {
                result.push(
                    Severity::Warning,
                    "routing",
                    format!("{path}.channels"),
                    format!("`{identity}` is already routed by group `{first}`"),
                );
            } else {
                seen.insert(identity, tag);
            }
        }
    }
}
