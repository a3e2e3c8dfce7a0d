use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    tracing::{error, info, warn},
};

use streamwatch_config::{
    Severity, StreamwatchConfig, ValidationResult, apply_env_overrides, discover_and_load,
    load_config, validate, validate_file,
};

/// Config plus where it came from.
pub struct Loaded {
    pub config: StreamwatchConfig,
    pub path: Option<PathBuf>,
    pub data_dir: PathBuf,
}

/// Load the explicit config file, or discover one. An explicit path must
/// exist and parse; discovery falls back to defaults. Env overrides apply in
/// both cases.
pub fn load(explicit: Option<&Path>, data_dir: Option<&Path>) -> Result<Loaded> {
    let (mut config, path) = match explicit {
        Some(path) => {
            let config = load_config(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            (config, Some(path.to_path_buf()))
        },
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);

    let data_dir = data_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(streamwatch_config::data_dir);
    Ok(Loaded {
        config,
        path,
        data_dir,
    })
}

fn diagnostics(loaded: &Loaded) -> ValidationResult {
    match &loaded.path {
        Some(path) => validate_file(path),
        None => validate(&loaded.config),
    }
}

/// Log diagnostics and refuse to continue on errors.
pub fn ensure_valid(loaded: &Loaded) -> Result<()> {
    let result = diagnostics(loaded);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, category = d.category, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, category = d.category, "{}", d.message),
        }
    }
    let errors = result.count(Severity::Error);
    if errors > 0 {
        bail!("configuration has {errors} error(s); run `streamwatch check-config` for details");
    }
    info!(
        config = %loaded.path.as_deref().map_or_else(|| "<defaults>".into(), |p| p.display().to_string()),
        groups = loaded.config.groups.len(),
        "configuration loaded"
    );
    Ok(())
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn check(loaded: &Loaded) -> Result<()> {
    if let Some(ref path) = loaded.path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let result = diagnostics(loaded);
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!(
            "  {BOLD}{color}{}{RESET} [{}] {}: {}",
            d.severity, d.category, d.path, d.message
        );
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    let routes = loaded.config.route_table();
    let watched = routes.values().filter(|r| r.destination.is_some()).count();
    eprintln!(
        "{} channel(s) routed, {watched} watched; cache at {}",
        routes.len(),
        loaded
            .config
            .monitor
            .resolve_cache_path(&loaded.data_dir)
            .display()
    );

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    const VALID: &str = r#"
[twitch]
client_id = "cid"
client_secret = "shh"

[discord]
token = "tkn"

[groups.dota]
destination = "1180000000000000002"
channels = ["Alice", "bob"]
"#;

    #[test]
    fn explicit_path_must_parse() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("streamwatch.toml");
        std::fs::write(&path, "[monitor\n").unwrap();
        assert!(load(Some(&path), Some(tmp.path())).is_err());

        let missing = tmp.path().join("nope.toml");
        assert!(load(Some(&missing), Some(tmp.path())).is_err());
    }

    #[test]
    fn valid_file_passes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("streamwatch.toml");
        std::fs::write(&path, VALID).unwrap();

        let loaded = load(Some(&path), Some(tmp.path())).unwrap();
        assert_eq!(loaded.data_dir, tmp.path());
        assert_eq!(loaded.config.route_table().len(), 2);
        ensure_valid(&loaded).unwrap();
    }

    #[test]
    fn invalid_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("streamwatch.toml");
        std::fs::write(&path, format!("{VALID}\n[monitor]\ngrace_misses = 0\n")).unwrap();

        let loaded = load(Some(&path), Some(tmp.path())).unwrap();
        assert!(ensure_valid(&loaded).is_err());
    }
}
