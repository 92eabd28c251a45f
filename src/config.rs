//! FatStd Configuration
//!
//! Handles parsing of `fatstd.toml`. The exports read the file once, on first
//! use, from the path in `FATSTD_CONFIG` or by searching upward from the
//! current directory. A missing file means defaults.

use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::MAX_LEN;

/// File name searched for when `FATSTD_CONFIG` is not set.
pub const CONFIG_FILE_NAME: &str = "fatstd.toml";

/// Environment variable holding an explicit config path.
pub const CONFIG_ENV: &str = "FATSTD_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching fatstd.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FatConfig {
    /// Log filter settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP test server settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Boundary limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl FatConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: FatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `FATSTD_CONFIG` if set, else search from the current directory.
    pub fn load_from_env() -> ConfigResult<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        let cwd = std::env::current_dir()?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.http.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "http.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.limits.max_len > MAX_LEN {
            return Err(ConfigError::Invalid(format!(
                "limits.max_len may not exceed {}",
                MAX_LEN
            )));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `FATSTD_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// HTTP test server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
    /// Pending captured requests kept before the oldest is dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-connection read timeout in milliseconds (0 disables)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Largest request body accepted by the server
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_queue_capacity() -> usize {
    64
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            read_timeout_ms: default_read_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Boundary limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitsConfig {
    /// Largest pointer/length pair accepted; can only be lowered from 2^31-1
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

fn default_max_len() -> usize {
    MAX_LEN
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_len: default_max_len(),
        }
    }
}

static GLOBAL: Lazy<FatConfig> = Lazy::new(|| match FatConfig::load_from_env() {
    Ok(config) => config,
    Err(e) => {
        tracing::warn!(error = %e, "ignoring unusable fatstd config");
        FatConfig::default()
    }
});

/// Process-wide configuration, loaded on first use.
pub fn global() -> &'static FatConfig {
    &GLOBAL
}
