//! Configuration loading and config-file resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One match-region database (the game servers write one DB per region)
#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    /// Short region tag used in API requests and audit records ("ar", "br")
    pub name: String,
    /// SQLite database path for this region's match/session tables
    pub db_path: PathBuf,
}

/// Service configuration for mgeops-wi
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Listen address for the HTTP API
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Match-region databases; at least one required
    pub regions: Vec<RegionConfig>,

    /// SQLite database holding operator data (alt links, audit records)
    #[serde(default = "default_ops_db")]
    pub ops_db_path: PathBuf,

    /// Rating a reverted account is reset to
    ///
    /// A fixed baseline rather than a chained undo value: when matches are
    /// selected non-contiguously there is no well-defined replay order, so
    /// the reverted account restarts from a known rating.
    #[serde(default = "default_baseline_rating")]
    pub baseline_rating: i64,

    /// Steam Web API key for vanity-URL resolution; omit to disable
    #[serde(default)]
    pub steam_api_key: Option<String>,

    /// Shared secret for API authentication; omit or empty to disable auth
    #[serde(default)]
    pub api_secret: Option<String>,
}

fn default_listen() -> String {
    "127.0.0.1:5730".to_string()
}

fn default_ops_db() -> PathBuf {
    PathBuf::from("mgeops.db")
}

fn default_baseline_rating() -> i64 {
    1600
}

impl ServiceConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: ServiceConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(Error::Config("at least one [[regions]] entry required".to_string()));
        }
        let mut names: Vec<&str> = self.regions.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.regions.len() {
            return Err(Error::Config("duplicate region names".to_string()));
        }
        Ok(())
    }

    /// Whether API authentication is enabled
    pub fn auth_enabled(&self) -> bool {
        matches!(&self.api_secret, Some(s) if !s.is_empty())
    }
}

/// Resolve the config file path, priority order:
/// 1. Command-line argument (highest priority)
/// 2. MGEOPS_CONFIG environment variable
/// 3. Platform config directory (mgeops/config.toml), if it exists
/// 4. ./mgeops.toml (fallback)
pub fn resolve_config_path(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("MGEOPS_CONFIG") {
        return PathBuf::from(path);
    }

    // Priority 3: Platform config directory
    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("mgeops").join("config.toml");
        if candidate.exists() {
            return candidate;
        }
    }

    // Priority 4: Working-directory fallback
    PathBuf::from("mgeops.toml")
}
