//! Virtual clock parameters.
//!
//! Durations are expressed in fractional seconds, matching how tests
//! usually think about sleeps ("advance 8.5 seconds").

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// How an advance moves the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Single atomic jump per advance.
    Jump,
    /// Fixed-size increments with a real-time pause in between.
    #[default]
    Stepped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = validation::validate_finite_durations))]
pub struct ClockConfig {
    pub mode: ClockMode,

    /// Sleeps shorter than this go to the real primitive.
    #[validate(range(min = 0.0, max = 3600.0))]
    pub passthrough_threshold_secs: f64,

    /// Step size for `stepped` mode.
    #[validate(range(exclusive_min = 0.0, max = 60.0))]
    pub increment_secs: f64,

    /// Real-time pause between steps. Defaults to `increment_secs / 10_000`.
    #[validate(range(min = 0.0, max = 1.0))]
    pub step_pause_secs: Option<f64>,

    /// How long a stepped advance waits for released sleepers to resume.
    #[validate(range(max = 60_000))]
    pub resume_timeout_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            mode: ClockMode::default(),
            passthrough_threshold_secs: 1.0,
            increment_secs: 0.1,
            step_pause_secs: None,
            resume_timeout_ms: 50,
        }
    }
}

impl ClockConfig {
    pub fn passthrough_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.passthrough_threshold_secs)
    }

    pub fn increment(&self) -> Duration {
        Duration::from_secs_f64(self.increment_secs)
    }

    pub fn step_pause(&self) -> Duration {
        match self.step_pause_secs {
            Some(secs) => Duration::from_secs_f64(secs),
            None => self.increment() / 10_000,
        }
    }

    pub fn resume_timeout(&self) -> Duration {
        Duration::from_millis(self.resume_timeout_ms)
    }
}

/// A partial clock block, such as a scenario's `clock:` section. Fields left
/// out keep the value of the configuration it is applied to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ClockMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough_threshold_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_pause_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_timeout_ms: Option<u64>,
}

impl ClockOverrides {
    /// Layers these overrides on top of `base`. The result is not validated.
    pub fn apply_to(&self, base: &ClockConfig) -> ClockConfig {
        ClockConfig {
            mode: self.mode.unwrap_or(base.mode),
            passthrough_threshold_secs: self
                .passthrough_threshold_secs
                .unwrap_or(base.passthrough_threshold_secs),
            increment_secs: self.increment_secs.unwrap_or(base.increment_secs),
            step_pause_secs: self.step_pause_secs.or(base.step_pause_secs),
            resume_timeout_ms: self.resume_timeout_ms.unwrap_or(base.resume_timeout_ms),
        }
    }
}
