//! # Configuration
//!
//! Settings read from `kinship.toml`. Every section is optional; missing
//! keys fall back to defaults.
//!
//! ```toml
//! [storage]
//! database = "family.db"
//! backend = "redb"        # or "file"
//!
//! [logging]
//! format = "json"         # or "text"
//! filter = "kinship=debug"
//! ```
//!
//! Precedence, lowest to highest: defaults, config file, environment
//! (`KINSHIP_DB`, `KINSHIP_LOG_FORMAT`), command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked for in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "kinship.toml";

/// Environment variable overriding `storage.database`.
pub const ENV_DATABASE: &str = "KINSHIP_DB";

/// Environment variable overriding `logging.format`.
pub const ENV_LOG_FORMAT: &str = "KINSHIP_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the explicit file if given, else `kinship.toml` if present,
    /// else defaults. Returns the file actually read, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default.exists() {
            return Ok((Self::from_file(&default)?, Some(default)));
        }
        Ok((Self::default(), None))
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.storage.database = PathBuf::from(db);
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = match format.as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            };
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.database.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.database must not be empty".to_string(),
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "logging.filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file
    pub database: PathBuf,
    /// Backend: "redb" (ACID database) or "file" (binary snapshot)
    pub backend: Backend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("kinship.db"),
            backend: Backend::Redb,
        }
    }
}

/// Storage backend kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database, written in place
    #[default]
    Redb,
    /// Whole-tree binary snapshot, rewritten after every change
    File,
}

impl Backend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::File => "file",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "kinship=info".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
