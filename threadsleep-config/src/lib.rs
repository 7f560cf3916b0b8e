//! # threadsleep Configuration System
//!
//! Hierarchical configuration for the virtual clock and its telemetry.
//!
//! ## Features
//! - **Layered sources**: defaults, YAML files and `THREADSLEEP_*` environment variables
//! - **Validation**: every loaded configuration is checked before use

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod clock;
mod error;
mod telemetry;
mod validation;

pub use clock::{ClockConfig, ClockMode, ClockOverrides};
pub use error::ConfigError;
pub use telemetry::TelemetryConfig;

/// Base configuration file, relative to the working directory.
pub const BASE_CONFIG_FILE: &str = "config/threadsleep.yaml";

/// Top‑level configuration container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct ThreadsleepConfig {
    /// Virtual clock behaviour.
    #[validate(nested)]
    pub clock: ClockConfig,

    /// Logging and metrics.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl ThreadsleepConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/threadsleep.yaml`, if present.
    /// 3. `config/<THREADSLEEP_ENV>.yaml` (default env `test`), if present.
    /// 4. `THREADSLEEP_*` environment variables, `__` separating nested keys.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ThreadsleepConfig::default()));

        if Path::new(BASE_CONFIG_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_CONFIG_FILE));
        }

        let env = std::env::var("THREADSLEEP_ENV").unwrap_or_else(|_| "test".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment)
    }

    /// Load configuration from a specific file, still honouring environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(ThreadsleepConfig::default()))
            .merge(Yaml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("THREADSLEEP_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
