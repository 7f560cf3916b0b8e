//! Observability configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Default `tracing` level; `RUST_LOG` still takes precedence.
    #[validate(custom(function = validation::validate_log_level))]
    pub log_level: String,

    /// Collect prometheus counters for clock activity.
    pub metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            metrics: false,
        }
    }
}
