//! YAML scenario format.
//!
//! ```yaml
//! name: four_sleepers
//! clock:
//!   mode: jump
//! sleepers:
//!   - { label: short, after_secs: 1 }
//!   - { label: ticker, after_secs: 2, repeat: 3 }
//! steps:
//!   - { advance_secs: 1, expect_time_secs: 1, expect_woken: [short] }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use threadsleep_config::{ClockConfig, ClockOverrides};
use validator::Validate;

use crate::error::ScenarioError;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Scenario {
    #[validate(length(min = 1))]
    pub name: String,

    /// Clock settings layered over the runner's base configuration.
    #[serde(default)]
    pub clock: ClockOverrides,

    #[validate(nested)]
    pub sleepers: Vec<SleeperSpec>,

    #[validate(nested)]
    pub steps: Vec<Step>,
}

/// One thread that sleeps `after_secs`, `repeat` times in a row.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SleeperSpec {
    #[validate(length(min = 1))]
    pub label: String,

    #[validate(range(min = 0.0, max = 31_536_000.0))]
    pub after_secs: f64,

    #[serde(default = "default_repeat")]
    #[validate(range(min = 1))]
    pub repeat: u32,
}

fn default_repeat() -> u32 {
    1
}

impl SleeperSpec {
    pub fn after(&self) -> Duration {
        Duration::from_secs_f64(self.after_secs)
    }
}

/// One `advance` call plus what should be true once it returns.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Step {
    #[validate(range(min = 0.0, max = 31_536_000.0))]
    pub advance_secs: f64,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 31_536_000.0))]
    pub expect_time_secs: Option<f64>,

    /// Labels released by this step, in any order. Repeats appear once per wake.
    #[serde(default)]
    pub expect_woken: Option<Vec<String>>,
}

impl Step {
    pub fn advance(&self) -> Duration {
        Duration::from_secs_f64(self.advance_secs)
    }

    pub fn expect_time(&self) -> Option<Duration> {
        self.expect_time_secs.map(Duration::from_secs_f64)
    }
}

impl Scenario {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.check()?;
        Ok(scenario)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// The clock this scenario runs on: its overrides on top of `base`.
    pub fn clock_config(&self, base: &ClockConfig) -> ClockConfig {
        self.clock.apply_to(base)
    }

    /// Field validation plus the cross-field rules serde can't express.
    /// Threshold checks need the resolved clock; see [`Scenario::check_clock`].
    pub fn check(&self) -> Result<(), ScenarioError> {
        self.validate()?;

        let mut labels = HashSet::new();
        for sleeper in &self.sleepers {
            if !labels.insert(sleeper.label.as_str()) {
                return Err(ScenarioError::Invalid(format!(
                    "duplicate sleeper label '{}'",
                    sleeper.label
                )));
            }
            if !sleeper.after_secs.is_finite() {
                return Err(ScenarioError::Invalid(format!(
                    "sleeper '{}': after_secs must be a finite number",
                    sleeper.label
                )));
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            if !step.advance_secs.is_finite() {
                return Err(ScenarioError::Invalid(format!(
                    "step {}: advance_secs must be a finite number",
                    index + 1
                )));
            }
            if let Some(secs) = step.expect_time_secs {
                if !secs.is_finite() || secs < 0.0 {
                    return Err(ScenarioError::Invalid(format!(
                        "step {}: expect_time_secs must be a non-negative number",
                        index + 1
                    )));
                }
            }
            for label in step.expect_woken.iter().flatten() {
                if !labels.contains(label.as_str()) {
                    return Err(ScenarioError::Invalid(format!(
                        "step {}: unknown sleeper label '{}'",
                        index + 1,
                        label
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rejects sleepers the resolved clock would hand to the real primitive;
    /// the runner could never observe their release.
    pub fn check_clock(&self, clock: &ClockConfig) -> Result<(), ScenarioError> {
        for sleeper in &self.sleepers {
            if sleeper.after() < clock.passthrough_threshold() || sleeper.after().is_zero() {
                return Err(ScenarioError::Invalid(format!(
                    "sleeper '{}' would pass through: {}s is below the {}s threshold",
                    sleeper.label, sleeper.after_secs, clock.passthrough_threshold_secs
                )));
            }
        }
        Ok(())
    }
}
