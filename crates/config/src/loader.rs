use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    Error, Result, env_subst::substitute_env, error::Context, schema::StreamwatchConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "streamwatch.toml",
    "streamwatch.yaml",
    "streamwatch.yml",
    "streamwatch.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<StreamwatchConfig> {
    let raw = read_substituted(path)?;
    parse_config(&raw, path)
}

/// Load the config file as an untyped value (used for unknown-field checks).
pub fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    let raw = read_substituted(path)?;
    parse_config_value(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./streamwatch.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/streamwatch/streamwatch.{toml,yaml,yml,json}` (user-global)
///
/// Returns the default config (and no path) if no file is found or the file
/// cannot be parsed.
pub fn discover_and_load() -> (StreamwatchConfig, Option<PathBuf>) {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return (cfg, Some(path)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    (StreamwatchConfig::default(), None)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/streamwatch/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "streamwatch").map(|d| d.config_dir().to_path_buf())
}

/// Returns the user data directory, falling back to `./data`.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "streamwatch")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Override credentials and paths from the process environment.
///
/// Recognised: `TWITCH_CLIENT_ID`, `TWITCH_CLIENT_SECRET`, `DISCORD_TOKEN`,
/// `STREAMWATCH_CACHE_PATH`. Empty values are ignored.
pub fn apply_env_overrides(config: &mut StreamwatchConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(
    config: &mut StreamwatchConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("TWITCH_CLIENT_ID") {
        config.twitch.client_id = v;
    }
    if let Some(v) = get("TWITCH_CLIENT_SECRET") {
        config.twitch.client_secret = Secret::new(v);
    }
    if let Some(v) = get("DISCORD_TOKEN") {
        config.discord.token = Secret::new(v);
    }
    if let Some(v) = get("STREAMWATCH_CACHE_PATH") {
        config.monitor.cache_path = Some(PathBuf::from(v));
    }
}

fn read_substituted(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(substitute_env(&raw))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn parse_config(raw: &str, path: &Path) -> Result<StreamwatchConfig> {
    match extension(path) {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        ext => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    match extension(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            serde_json::to_value(v).context("convert toml")
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            serde_json::to_value(v).context("convert yaml")
        },
        "json" => Ok(serde_json::from_str(raw)?),
        ext => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, tempfile::TempDir};

    #[test]
    fn loads_each_format() {
        let tmp = TempDir::new().unwrap();

        let toml_path = tmp.path().join("streamwatch.toml");
        std::fs::write(&toml_path, "[monitor]\npoll_interval_secs = 60\n").unwrap();
        assert_eq!(load_config(&toml_path).unwrap().monitor.poll_interval_secs, 60);

        let yaml_path = tmp.path().join("streamwatch.yaml");
        std::fs::write(&yaml_path, "monitor:\n  grace_misses: 4\n").unwrap();
        assert_eq!(load_config(&yaml_path).unwrap().monitor.grace_misses, 4);

        let json_path = tmp.path().join("streamwatch.json");
        std::fs::write(&json_path, r#"{"twitch": {"client_id": "abc"}}"#).unwrap();
        assert_eq!(load_config(&json_path).unwrap().twitch.client_id, "abc");
    }

    #[test]
    fn rejects_unknown_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("streamwatch.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/streamwatch.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_replace_credentials() {
        let mut cfg = StreamwatchConfig::default();
        cfg.twitch.client_id = "from-file".into();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "TWITCH_CLIENT_ID" => Some("from-env".into()),
            "TWITCH_CLIENT_SECRET" => Some("secret".into()),
            "DISCORD_TOKEN" => Some("".into()),
            _ => None,
        });
        assert_eq!(cfg.twitch.client_id, "from-env");
        assert_eq!(cfg.twitch.client_secret.expose_secret(), "secret");
        assert_eq!(cfg.discord.token.expose_secret(), "");
        assert!(cfg.monitor.cache_path.is_none());
    }

    #[test]
    fn value_loader_converts_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("streamwatch.toml");
        std::fs::write(&path, "[groups.x]\nchannels = [\"a\"]\n").unwrap();
        let value = load_config_value(&path).unwrap();
        assert_eq!(value["groups"]["x"]["channels"][0], "a");
    }
}
