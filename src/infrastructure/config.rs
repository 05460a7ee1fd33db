//! Layered configuration: defaults ⊕ `swarm1.yaml` ⊕ `swarm1.local.yaml` ⊕
//! `SWARM1_*` env, validated after merge.
//!
//! Merges with Figment in a fixed order and validates as a separate pass
//! after the merge completes, rather than inline per-layer.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_concurrency")]
    pub default_concurrency: u32,
    #[serde(default = "default_retries")]
    pub default_retries_max: u32,
    #[serde(default = "default_backoff_ms")]
    pub default_backoff_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_artifact_root")]
    pub artifact_root: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_concurrency: default_concurrency(),
            default_retries_max: default_retries(),
            default_backoff_ms: default_backoff_ms(),
            default_timeout_ms: default_timeout_ms(),
            artifact_root: default_artifact_root(),
        }
    }
}

const fn default_concurrency() -> u32 {
    3
}
const fn default_retries() -> u32 {
    1
}
const fn default_backoff_ms() -> u64 {
    1_000
}
const fn default_timeout_ms() -> u64 {
    15_000
}
fn default_artifact_root() -> String {
    "runs".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file_path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub jwks_url: Option<String>,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scheduler.default_concurrency must be between 1 and 10, got {0}")]
    InvalidConcurrency(u32),
    #[error("logging.level must be one of trace,debug,info,warn,error, got {0:?}")]
    InvalidLogLevel(String),
    #[error("logging.format must be one of json,pretty, got {0:?}")]
    InvalidLogFormat(String),
    #[error("figment error: {0}")]
    Figment(#[from] figment::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<Config, ConfigError> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("swarm1.yaml"))
            .merge(Yaml::file("swarm1.local.yaml"))
            .merge(Env::prefixed("SWARM1_").split("__"))
            .extract()?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), ConfigError> {
        if !(1..=10).contains(&config.scheduler.default_concurrency) {
            return Err(ConfigError::InvalidConcurrency(config.scheduler.default_concurrency));
        }
        if !["trace", "debug", "info", "warn", "error"].contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        if !["json", "pretty"].contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn rejects_out_of_range_concurrency() {
        let mut config = Config::default();
        config.scheduler.default_concurrency = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLogLevel(_))));
    }
}
