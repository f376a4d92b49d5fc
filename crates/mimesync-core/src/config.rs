//! Configuration management for mimesync.
//!
//! Configuration is stored in TOML format and supports environment variable
//! overrides.
//!
//! ## Configuration Sources
//!
//! 1. **Config file**: `config.toml` in the platform config directory, or in
//!    `$MIMESYNC_CONFIG_DIR` when set
//! 2. **Environment variables**: `MIMESYNC_REFRESH_INTERVAL_MS` and
//!    `MIMESYNC_DATA_DIR` override the file
//!
//! ## Example Configuration File
//!
//! ```toml
//! [refresh]
//! interval_ms = 86400000   # negative disables background refresh
//!
//! [fetch]
//! timeout_secs = 30
//! user_agent = "mimesync/0.1.0"
//!
//! [paths]
//! root = "/home/user/.local/share/mimesync"
//!
//! [sources]
//! nginx = "https://mirror.example.com/nginx/mime.types"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sources::DEFAULT_USER_AGENT;
use crate::{Error, RefreshInterval, Result, SourceId};

/// Environment variable pointing at the directory holding `config.toml`
pub const CONFIG_DIR_ENV: &str = "MIMESYNC_CONFIG_DIR";
/// Environment variable overriding `paths.root`
pub const DATA_DIR_ENV: &str = "MIMESYNC_DATA_DIR";
/// Environment variable overriding `refresh.interval_ms`
pub const INTERVAL_ENV: &str = "MIMESYNC_REFRESH_INTERVAL_MS";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Background refresh settings
    pub refresh: RefreshConfig,
    /// HTTP settings
    pub fetch: FetchConfig,
    /// File system paths
    pub paths: PathsConfig,
    /// Per-source URL overrides, keyed by source name (`apache`, `text`, ...)
    pub sources: BTreeMap<String, String>,
}

/// Background refresh settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Milliseconds between refresh cycles; negative disables the loop.
    pub interval_ms: i64,
}

/// HTTP settings for feed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Client identifier sent to IANA.
    pub user_agent: String,
}

/// File system paths configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `mimetypes.json` and `versions.json`.
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from the default location, then apply environment
    /// overrides.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from an explicit file path without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Save the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config: {e}")))
    }

    /// Refresh interval as a typed value.
    #[must_use]
    pub fn refresh_interval(&self) -> RefreshInterval {
        RefreshInterval::from_millis(self.refresh.interval_ms)
    }

    /// URL overrides keyed by source; unknown source names are an error.
    pub fn source_overrides(&self) -> Result<BTreeMap<SourceId, String>> {
        self.sources
            .iter()
            .map(|(name, url)| Ok((name.parse::<SourceId>()?, url.clone())))
            .collect()
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                self.paths.root = PathBuf::from(trimmed);
            }
        }

        if let Ok(raw) = std::env::var(INTERVAL_ENV) {
            self.refresh.interval_ms = raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {INTERVAL_ENV} '{raw}': {e}")))?;
        }

        Ok(())
    }

    /// Path of the configuration file.
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed).join("config.toml"));
            }
        }

        let project_dirs = directories::ProjectDirs::from("dev", "mimesync", "mimesync")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: RefreshInterval::DEFAULT_MILLIS,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: directories::ProjectDirs::from("dev", "mimesync", "mimesync").map_or_else(
                || {
                    directories::BaseDirs::new().map_or_else(
                        || PathBuf::from(".mimesync"),
                        |base| base.home_dir().join(".mimesync"),
                    )
                },
                |dirs| dirs.data_dir().to_path_buf(),
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh: RefreshConfig::default(),
            fetch: FetchConfig::default(),
            paths: PathsConfig::default(),
            sources: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.refresh.interval_ms, 86_400_000);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.fetch.user_agent.starts_with("mimesync/"));
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[refresh]\ninterval_ms = -1\n\n[sources]\nnginx = \"http://localhost/nginx\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.refresh_interval(), RefreshInterval::Disabled);
        assert_eq!(config.fetch, FetchConfig::default());
        let overrides = config.source_overrides().unwrap();
        assert_eq!(
            overrides.get(&SourceId::Nginx).map(String::as_str),
            Some("http://localhost/nginx")
        );
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[refresh\ninterval_ms = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_source_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sources]\ngopher = \"http://localhost\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(matches!(config.source_overrides(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.refresh.interval_ms = 60_000;
        config.paths.root = dir.path().join("data");
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
