/// Config schema types (provider credentials, transport, monitor settings,
/// tracked groups).
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    streamwatch_common::Identity,
    tracing::warn,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamwatchConfig {
    pub twitch: TwitchConfig,
    pub discord: DiscordConfig,
    pub monitor: MonitorConfig,
    /// Tracked channels, grouped by tag. Each group posts to one destination.
    pub groups: BTreeMap<String, GroupConfig>,
}

/// Twitch Helix credentials (client-credentials grant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchConfig {
    pub client_id: String,
    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: Secret<String>,
    /// Helix API root. Defaults to `https://api.twitch.tv/helix`.
    pub api_base_url: String,
    /// OAuth root. Defaults to `https://id.twitch.tv/oauth2`.
    pub auth_base_url: String,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: Secret::new(String::new()),
            api_base_url: "https://api.twitch.tv/helix".into(),
            auth_base_url: "https://id.twitch.tv/oauth2".into(),
        }
    }
}

/// Discord bot credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
    /// REST API root. Defaults to `https://discord.com/api/v10`.
    pub api_base_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            api_base_url: "https://discord.com/api/v10".into(),
        }
    }
}

/// Reconciliation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between ticks. Defaults to 120.
    pub poll_interval_secs: u64,
    /// Consecutive offline observations before a notification is retracted.
    /// Defaults to 3.
    pub grace_misses: u32,
    /// Timeout for each provider or transport HTTP request. Defaults to 15.
    pub request_timeout_secs: u64,
    /// Snapshot location. Defaults to `<data_dir>/live_cache.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 120,
            grace_misses: 3,
            request_timeout_secs: 15,
            cache_path: None,
        }
    }
}

impl MonitorConfig {
    /// Resolve the snapshot path against a data directory.
    pub fn resolve_cache_path(&self, data_dir: &Path) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| data_dir.join("live_cache.json"))
    }
}

/// One group of tracked channels sharing a destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Transport destination id (a Discord channel id). Groups without one
    /// are not watched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Channel logins, any case.
    pub channels: Vec<String>,
}

impl GroupConfig {
    /// The destination, if one is set and non-blank.
    pub fn destination(&self) -> Option<&str> {
        self.destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Where notifications for one identity go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub destination: Option<String>,
    pub group: String,
}

/// Identity to route, built once at startup.
pub type RouteTable = BTreeMap<Identity, Route>;

impl StreamwatchConfig {
    /// Build the identity → route map.
    ///
    /// Identities are canonicalised; the first group (in tag order) listing an
    /// identity wins. Malformed entries are skipped with a warning.
    pub fn route_table(&self) -> RouteTable {
        let mut routes = RouteTable::new();
        for (tag, group) in &self.groups {
            for raw in &group.channels {
                let identity = match Identity::new(raw) {
                    Ok(identity) => identity,
                    Err(e) => {
                        warn!(group = %tag, error = %e, "skipping malformed channel");
                        continue;
                    },
                };
                routes.entry(identity).or_insert_with(|| Route {
                    destination: group.destination().map(str::to_string),
                    group: tag.clone(),
                });
            }
        }
        routes
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
