//! Engine configuration.
//!
//! Loaded from a TOML file, then overridden from `CAD_*` environment
//! variables. Every section is optional; a missing file section or field
//! falls back to its default.

use std::path::Path;

use cad_clients::CloudProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actions::ExecutorOptions;
use crate::runner::RetryPolicy;

pub const ENV_EXPERIMENTAL_ENABLED: &str = "CAD_EXPERIMENTAL_ENABLED";
pub const ENV_DRY_RUN: &str = "CAD_DRY_RUN";
pub const ENV_CONCURRENT_ACTIONS: &str = "CAD_CONCURRENT_ACTIONS";
pub const ENV_LOG_JSON: &str = "CAD_LOG_JSON";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}: expected a boolean")]
    InvalidEnv { key: String, value: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadConfig {
    pub retry: RetryPolicy,
    pub executor: ExecutorOptions,
    pub investigations: InvestigationsConfig,
    pub access: AccessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestigationsConfig {
    /// Allow investigations marked experimental to be selected.
    pub experimental_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Permission scope requested for every cluster-API grant.
    pub api_scope: String,
    /// Providers the precheck lets through.
    pub supported_cloud_providers: Vec<CloudProvider>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            api_scope: "cad-investigation".to_string(),
            supported_cloud_providers: vec![CloudProvider::Aws],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CadConfig {
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&content)
    }

    /// Apply `CAD_*` overrides from `vars`. Unrelated keys are ignored.
    pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let target = match key {
                ENV_EXPERIMENTAL_ENABLED => &mut self.investigations.experimental_enabled,
                ENV_DRY_RUN => &mut self.executor.dry_run,
                ENV_CONCURRENT_ACTIONS => &mut self.executor.concurrent,
                ENV_LOG_JSON => &mut self.logging.json,
                _ => continue,
            };
            *target = parse_bool(key, value.as_ref())?;
        }
        Ok(self)
    }

    /// Overrides from the process environment.
    pub fn from_env(self) -> ConfigResult<Self> {
        self.with_env_overrides(std::env::vars())
    }
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
