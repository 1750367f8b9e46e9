//! Configuration loading and API base resolution
//!
//! The API base is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PIXGATE_API_BASE`)
//! 3. TOML config file
//! 4. Compiled default `http://localhost:8000`
//!
//! A missing or unreadable TOML file never stops startup; the failure is kept
//! on the resolver for logging and the remaining tiers are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Compiled default backend location
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Fixed capacity bound of one upload batch
pub const DEFAULT_MAX_FILES: usize = 20;

/// Environment variable overriding the API base
pub const API_BASE_ENV_VAR: &str = "PIXGATE_API_BASE";

/// Default broadcast capacity of the event bus
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// What `add_files` does when the selection would overflow the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityPolicy {
    /// Append new files to the existing batch up to the cap, drop the excess
    #[default]
    Append,
    /// Replace the existing batch with the new selection, truncated to the cap
    Replace,
}

impl fmt::Display for CapacityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityPolicy::Append => write!(f, "append"),
            CapacityPolicy::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for CapacityPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(CapacityPolicy::Append),
            "replace" => Ok(CapacityPolicy::Replace),
            other => Err(format!(
                "unknown capacity policy '{}' (expected 'append' or 'replace')",
                other
            )),
        }
    }
}

/// Runtime configuration injected into every component
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend base URL, without trailing slash
    pub api_base: String,
    /// Capacity bound of one batch
    pub max_files: usize,
    /// Overflow behavior of `add_files`
    pub capacity_policy: CapacityPolicy,
    /// Per-request timeout; `None` inherits the transport's behavior
    pub request_timeout: Option<Duration>,
    /// Event bus channel capacity
    pub event_capacity: usize,
}

impl ApiConfig {
    /// Create a config for `api_base` with every other field at its default
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: normalize_base(&api_base.into()),
            max_files: DEFAULT_MAX_FILES,
            capacity_policy: CapacityPolicy::default(),
            request_timeout: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_capacity_policy(mut self, policy: CapacityPolicy) -> Self {
        self.capacity_policy = policy;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL of a backend endpoint path such as `/upload-multi`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Resolve a backend-returned path against the API base
    pub fn resolve(&self, path: &str) -> String {
        crate::api::resolve_url(&self.api_base, path)
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "API base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }
        if self.max_files == 0 {
            return Err(Error::Config("max_files must be at least 1".to_string()));
        }
        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Config(
                "request timeout must be positive; omit it for no timeout".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

/// Configuration file contents
///
/// Every field is optional; absent fields fall through to the next tier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default)]
    pub max_files: Option<usize>,

    #[serde(default)]
    pub capacity_policy: Option<CapacityPolicy>,

    /// Request timeout in seconds (no timeout when absent)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Locate the platform configuration file, if one exists
///
/// Linux checks `~/.config/pixgate/config.toml` then `/etc/pixgate/config.toml`;
/// other platforms check the user config directory only.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("pixgate").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/pixgate/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Multi-tier resolver for [`ApiConfig`]
///
/// Loading the TOML tier does not log; the outcome is kept so the binary can
/// report it once its subscriber is installed (see [`ConfigResolver::log_load_outcome`]).
#[derive(Debug)]
pub struct ConfigResolver {
    cli_api_base: Option<String>,
    toml: TomlConfig,
    config_path: Option<PathBuf>,
    load_error: Option<Error>,
}

impl ConfigResolver {
    /// Resolver reading the TOML tier from `config_path`, or from the platform
    /// default location when `None`
    ///
    /// A file that cannot be read or parsed leaves the TOML tier empty and is
    /// recorded in [`ConfigResolver::load_error`].
    pub fn new(cli_api_base: Option<&str>, config_path: Option<&Path>) -> Self {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(default_config_path);

        let (toml, load_error) = match &path {
            Some(path) => match load_toml_config(path) {
                Ok(config) => (config, None),
                Err(e) => (TomlConfig::default(), Some(e)),
            },
            None => (TomlConfig::default(), None),
        };

        Self {
            config_path: path,
            load_error,
            ..Self::with_toml(cli_api_base, toml)
        }
    }

    /// Resolver with an already-loaded TOML tier
    pub fn with_toml(cli_api_base: Option<&str>, toml: TomlConfig) -> Self {
        Self {
            cli_api_base: cli_api_base.map(str::to_string),
            toml,
            config_path: None,
            load_error: None,
        }
    }

    /// Config file the TOML tier was read from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Why the config file was ignored, if it was
    pub fn load_error(&self) -> Option<&Error> {
        self.load_error.as_ref()
    }

    /// Log how the TOML tier was obtained
    pub fn log_load_outcome(&self) {
        match (&self.config_path, &self.load_error) {
            (Some(_), Some(e)) => warn!("{}; continuing with defaults", e),
            (Some(path), None) => info!("Loaded config file {}", path.display()),
            (None, _) => debug!("No config file found; using environment and defaults"),
        }
    }

    /// Loaded TOML tier
    pub fn toml(&self) -> &TomlConfig {
        &self.toml
    }

    /// API base after applying the priority order
    pub fn resolve_api_base(&self) -> String {
        if let Some(base) = self.cli_api_base.as_deref().filter(|b| !b.trim().is_empty()) {
            debug!(api_base = %base, "API base from command line");
            return base.to_string();
        }

        if let Ok(base) = std::env::var(API_BASE_ENV_VAR) {
            if !base.trim().is_empty() {
                debug!(api_base = %base, "API base from {}", API_BASE_ENV_VAR);
                return base;
            }
        }

        if let Some(base) = self.toml.api_base.as_deref().filter(|b| !b.trim().is_empty()) {
            debug!(api_base = %base, "API base from config file");
            return base.to_string();
        }

        DEFAULT_API_BASE.to_string()
    }

    /// Build and validate the full configuration
    pub fn resolve(&self) -> Result<ApiConfig> {
        let mut config = ApiConfig::new(self.resolve_api_base());

        if let Some(max_files) = self.toml.max_files {
            config.max_files = max_files;
        }
        if let Some(policy) = self.toml.capacity_policy {
            config.capacity_policy = policy;
        }
        // 0 means no timeout
        config.request_timeout = self
            .toml
            .request_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        config.validate()?;
        Ok(config)
    }
}
