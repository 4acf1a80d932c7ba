//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.prefcase/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prefs::ThemeSupport;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PrefcaseConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PreferencesConfig {
    pub path: Option<String>,
    pub follow_system_supported: Option<bool>,
    pub reload_interval_ms: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;
pub const DEFAULT_LOG_FILE_NAME: &str = "prefcase.log";
pub const DEFAULT_STORE_FILE_NAME: &str = "preferences.toml";
pub const DEFAULT_RELOAD_INTERVAL_MS: u64 = 500;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub log_level: LevelFilter,
    pub log_file: PathBuf,
    pub store_path: PathBuf,
    pub theme_support: ThemeSupport,
    pub reload_interval: Duration,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.prefcase`, the home of config, preferences and logs.
pub fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".prefcase"))
}

/// Returns the path to `~/.prefcase/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    app_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.prefcase/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `PrefcaseConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<PrefcaseConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(PrefcaseConfig::default());
        }
    };
    load_config_from(&path)
}

/// Same as [`load_config`] for an explicit path.
pub fn load_config_from(path: &Path) -> Result<PrefcaseConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(PrefcaseConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: PrefcaseConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# prefcase configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# log_level = "info"                 # "off", "error", "warn", "info", "debug", "trace"
# log_file = "~/.prefcase/prefcase.log"

# [preferences]
# path = "~/.prefcase/preferences.toml"   # Or set PREFCASE_STORE env var
# follow_system_supported = true          # false offers "auto_battery" instead
# reload_interval_ms = 500                # How often `theme watch` re-reads the file
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_store` is the `--store` flag (None = not specified).
pub fn resolve(config: &PrefcaseConfig, cli_store: Option<&str>) -> ResolvedConfig {
    resolve_with_env(config, cli_store, |name| std::env::var(name).ok())
}

/// [`resolve`] with an explicit environment lookup.
pub fn resolve_with_env(
    config: &PrefcaseConfig,
    cli_store: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let base = app_dir().unwrap_or_else(|| PathBuf::from("."));

    // Store path: CLI → env → config → default
    let store_path = cli_store
        .map(|s| s.to_string())
        .or_else(|| env("PREFCASE_STORE"))
        .or_else(|| config.preferences.path.clone())
        .map(|p| expand_home(&p))
        .unwrap_or_else(|| base.join(DEFAULT_STORE_FILE_NAME));

    // Log level: env → config → default. Unparseable values fall back.
    let log_level = env("PREFCASE_LOG_LEVEL")
        .or_else(|| config.general.log_level.clone())
        .and_then(|level| match level.parse::<LevelFilter>() {
            Ok(level) => Some(level),
            Err(_) => {
                warn!("Unknown log level '{}', using {}", level, DEFAULT_LOG_LEVEL);
                None
            }
        })
        .unwrap_or(DEFAULT_LOG_LEVEL);

    let log_file = config
        .general
        .log_file
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(|| base.join(DEFAULT_LOG_FILE_NAME));

    // Follow-system support: env → config → default (supported)
    let follow_system_supported = env("PREFCASE_FOLLOW_SYSTEM")
        .and_then(|v| parse_bool(&v))
        .or(config.preferences.follow_system_supported)
        .unwrap_or(true);

    let reload_interval = Duration::from_millis(
        config
            .preferences
            .reload_interval_ms
            .unwrap_or(DEFAULT_RELOAD_INTERVAL_MS)
            .max(1),
    );

    ResolvedConfig {
        log_level,
        log_file,
        store_path,
        theme_support: ThemeSupport::from_follow_system_supported(follow_system_supported),
        reload_interval,
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
