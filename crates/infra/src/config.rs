//! Configuration loading and representation.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use stockflow_observability::{LogFormat, LogSettings};

pub const ENV_VAR: &str = "STOCKFLOW_ENV";
pub const DATA_DIR_VAR: &str = "STOCKFLOW_DATA_DIR";
pub const LOG_FORMAT_VAR: &str = "STOCKFLOW_LOG_FORMAT";
pub const LOG_FILTER_VAR: &str = "STOCKFLOW_LOG";

pub const DEFAULT_DATA_DIR: &str = "./specifications";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Deployment environment. Development seeds the catalog at startup.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment {other:?} (expected `development` or `production`)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub environment: Environment,
    pub data_dir: PathBuf,
    pub log: LogSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log: LogSettings::default(),
        }
    }
}

impl AppConfig {
    /// Read the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = non_empty(lookup(ENV_VAR)) {
            config.environment = raw.parse().map_err(|message| ConfigError::Invalid {
                var: ENV_VAR,
                message,
            })?;
        }
        if let Some(raw) = non_empty(lookup(DATA_DIR_VAR)) {
            config.data_dir = PathBuf::from(raw);
        }
        if let Some(raw) = non_empty(lookup(LOG_FORMAT_VAR)) {
            config.log.format = raw.parse::<LogFormat>().map_err(|err| ConfigError::Invalid {
                var: LOG_FORMAT_VAR,
                message: err.to_string(),
            })?;
        }
        if let Some(raw) = non_empty(lookup(LOG_FILTER_VAR)) {
            config.log.filter = raw;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
