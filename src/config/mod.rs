//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod storage;

pub use storage::{StorageConfig, StorageType};

use serde::Deserialize;

use crate::bus::MessagingConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "inkpost.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "INKPOST_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "INKPOST";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Counter storage backend.
    pub storage: StorageConfig,
    /// Event bus settings.
    pub messaging: MessagingConfig,
    /// Site-wide settings.
    pub website: WebsiteConfig,
    /// Comment module settings.
    pub comment: CommentConfig,
}

/// Site-wide settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebsiteConfig {
    /// Public origin used to build post links, without trailing slash.
    pub base_host: String,
    /// Global switch for accepting new comments and replies.
    pub comment_enabled: bool,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            base_host: "http://localhost:8080".to_string(),
            comment_enabled: true,
        }
    }
}

/// Comment module settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommentConfig {
    /// Size of the latest-comments listing.
    pub latest_limit: usize,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self { latest_limit: 5 }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `inkpost.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, `__` nesting
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self::default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.messaging.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "messaging.channel_capacity must be positive".to_string(),
            ));
        }
        let host = &self.website.base_host;
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "website.base_host must be an http(s) origin, got '{host}'"
            )));
        }
        Ok(())
    }
}
