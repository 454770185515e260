//! Configuration for the keystore wallet
//!
//! Values come from three places, later ones winning:
//! 1. Built-in defaults
//! 2. A JSON config file ([`Config::from_file`])
//! 3. Environment variables (`KEYSTORE_SCHEME`, `KEYSTORE_AUDIT_LOG`,
//!    `KEYSTORE_LOG`, `KEYSTORE_LOG_JSON`), optionally loaded from `.env`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// URL scheme used for accounts held by the keystore
pub const DEFAULT_SCHEME: &str = "keystore";

/// Environment variable names
mod env_vars {
    pub const SCHEME: &str = "KEYSTORE_SCHEME";
    pub const AUDIT_LOG: &str = "KEYSTORE_AUDIT_LOG";
    pub const LOG_LEVEL: &str = "KEYSTORE_LOG";
    pub const LOG_JSON: &str = "KEYSTORE_LOG_JSON";
}

/// Logging settings consumed by [`crate::telemetry::init_tracing`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `keystore_wallet=debug`
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scheme of the URLs assigned to keystore accounts
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Path to the signing audit log (JSONL). Disabled when unset.
    #[serde(default)]
    pub audit_log_path: Option<String>,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            audit_log_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults plus environment overrides
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides on top of this configuration
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(scheme) = std::env::var(env_vars::SCHEME) {
            tracing::debug!(scheme = %scheme, "Using KEYSTORE_SCHEME");
            self.scheme = scheme;
        }
        if let Ok(path) = std::env::var(env_vars::AUDIT_LOG) {
            self.audit_log_path = Some(path);
        }
        if let Ok(level) = std::env::var(env_vars::LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Ok(json) = std::env::var(env_vars::LOG_JSON) {
            self.logging.json = matches!(json.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.scheme.is_empty() || self.scheme.contains("://") {
            return Err(Error::Config(format!(
                "invalid account URL scheme {:?}",
                self.scheme
            )));
        }
        Ok(())
    }
}
