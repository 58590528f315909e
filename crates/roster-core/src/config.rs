//! Configuration: a small TOML file plus environment overrides.
//!
//! Resolution order for the store path: CLI flag, `ROSTER_STORE` env var,
//! config file, then the default `roster.sqlite3` next to the config.
//! Output format resolves CLI > env (`ROSTER_FORMAT`) > config > terminal
//! detection.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "roster.toml";
pub const STORE_ENV: &str = "ROSTER_STORE";
pub const FORMAT_ENV: &str = "ROSTER_FORMAT";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    /// Preferred output format: `pretty`, `text`, or `json`.
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("roster.sqlite3")
}

/// Load the config file at `path`, or defaults when it does not exist.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// The store path after applying CLI and environment overrides.
#[must_use]
pub fn resolve_store_path(cli_store: Option<&Path>, config: &Config) -> PathBuf {
    if let Some(path) = cli_store {
        return path.to_path_buf();
    }
    if let Some(path) = env::var_os(STORE_ENV) {
        return PathBuf::from(path);
    }
    config.store.path.clone()
}

/// The output format after applying CLI and environment overrides.
///
/// # Errors
///
/// Infallible today; the `Result` keeps room for stricter validation.
pub fn resolve_output(cli_json: bool, config: &Config) -> Result<String> {
    fn normalize(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return Ok("json".to_string());
    }

    if let Some(mode) = env::var(FORMAT_ENV).ok().as_deref().and_then(normalize) {
        return Ok(mode.to_string());
    }

    if let Some(mode) = config.output.as_deref().and_then(normalize) {
        return Ok(mode.to_string());
    }

    if std::io::stdout().is_terminal() {
        Ok("pretty".to_string())
    } else {
        Ok("text".to_string())
    }
}
