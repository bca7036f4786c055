use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level dashboard configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Store validations
        if self.store.backend != "memory" {
            return Err(format!(
                "store.backend '{}' is not supported (expected 'memory')",
                self.store.backend
            ));
        }
        if let Some(endpoint) = &self.store.endpoint
            && !endpoint.is_empty()
        {
            return Err(format!(
                "store.endpoint '{endpoint}' has no effect with the memory backend"
            ));
        }
        if let Some(seed) = &self.store.seed
            && seed.is_empty()
        {
            return Err("store.seed must not be empty when set".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // UI validation
        if self.ui.notice_ttl_ms == 0 {
            return Err("ui.notice_ttl_ms must be > 0".into());
        }
        Ok(())
    }

    /// How long a posted notice stays visible.
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(u64::from(self.ui.notice_ttl_ms))
    }
}

/// Store backend selection and seeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend; only the in-memory backend is built in.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Remote endpoint for network-backed stores; rejected by the memory
    /// backend.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Optional path to a JSON file with the initial `hospitals/` tree.
    #[serde(default)]
    pub seed: Option<String>,
}

fn default_backend() -> String {
    "memory".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Auto-dismiss interval for operator notices, in milliseconds.
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u32,
}

fn default_notice_ttl_ms() -> u32 {
    3_000
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notice_ttl_ms: default_notice_ttl_ms(),
        }
    }
}

/// Errors raised while resolving the configuration blob.
///
/// All of these are fatal at startup; there is no retry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    Missing { path: String },

    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads and validates the configuration file at `path`.
///
/// A missing file is the ConfigurationMissing case: fatal, surfaced as a
/// static message by the caller.
pub fn load_config(path: &str) -> Result<DashboardConfig, ConfigError> {
    if !Path::new(path).exists() {
        return Err(ConfigError::Missing { path: path.into() });
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.into(),
        source,
    })?;

    let config: DashboardConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;

    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}
