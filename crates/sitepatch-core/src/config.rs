//! Configuration for the model server connection and the streaming relay.
//!
//! Configuration is stored in TOML. Missing files and missing keys fall back
//! to defaults, and a few environment variables override the file.
//!
//! ## Resolution order
//!
//! 1. **File**: `$SITEPATCH_CONFIG` if set, else `config.toml` in the
//!    platform config directory (see [`Config::config_path`])
//! 2. **Environment**: `LMHOST`, `LMPORT`, `tokenlimit`
//!
//! ## Example configuration file
//!
//! ```toml
//! [lmstudio]
//! host = "127.0.0.1"
//! port = 1234
//! max_tokens = 4096
//! timeout_secs = 300
//!
//! [relay]
//! channel_capacity = 32
//! ```
//!
//! ```rust
//! use sitepatch_core::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.lmstudio.base_url(), "http://127.0.0.1:1234");
//! assert_eq!(config.relay.channel_capacity, 32);
//! ```

use crate::relay::DEFAULT_CHANNEL_CAPACITY;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SITEPATCH_CONFIG";
/// Environment variable overriding [`LmStudioConfig::host`].
pub const HOST_ENV: &str = "LMHOST";
/// Environment variable overriding [`LmStudioConfig::port`].
pub const PORT_ENV: &str = "LMPORT";
/// Environment variable overriding [`LmStudioConfig::max_tokens`].
pub const TOKEN_LIMIT_ENV: &str = "tokenlimit";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model server connection.
    pub lmstudio: LmStudioConfig,
    /// Streaming relay tuning.
    pub relay: RelayConfig,
}

/// Connection settings for the local model server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmStudioConfig {
    pub host: String,
    pub port: u16,
    /// Completion token budget sent with every request.
    pub max_tokens: u32,
    /// Whole-request timeout, including reading a streamed body.
    pub timeout_secs: u64,
}

impl Default for LmStudioConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1234,
            max_tokens: 4096,
            timeout_secs: 300,
        }
    }
}

impl LmStudioConfig {
    /// `http://{host}:{port}` with the host trimmed.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host.trim(), self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Deltas buffered between the transport reader and the sink writer.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Loads configuration from the default location and applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if an override variable holds an unparseable number.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from `path`, using defaults when it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Applies `LMHOST`, `LMPORT` and `tokenlimit` as returned by `lookup`.
    ///
    /// Blank values are ignored. Numbers are trimmed before parsing.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = value(HOST_ENV) {
            self.lmstudio.host = host.trim().to_string();
        }
        if let Some(port) = value(PORT_ENV) {
            self.lmstudio.port = port
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {PORT_ENV} '{port}': {e}")))?;
        }
        if let Some(limit) = value(TOKEN_LIMIT_ENV) {
            self.lmstudio.max_tokens = limit
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {TOKEN_LIMIT_ENV} '{limit}': {e}")))?;
        }
        if self.relay.channel_capacity == 0 {
            warn!("relay.channel_capacity must be positive, using 1");
            self.relay.channel_capacity = 1;
        }
        Ok(())
    }

    /// Location of the configuration file.
    ///
    /// `$SITEPATCH_CONFIG` when set, otherwise `config.toml` under the
    /// platform config directory:
    /// - Linux: `~/.config/sitepatch/config.toml`
    /// - macOS: `~/Library/Application Support/dev.sitepatch.sitepatch/config.toml`
    /// - Windows: `%APPDATA%\sitepatch\sitepatch\config\config.toml`
    pub fn config_path() -> Result<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(explicit));
        }
        let project_dirs = directories::ProjectDirs::from("dev", "sitepatch", "sitepatch")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}
