//! Custom validation functions for configuration.

use validator::ValidationError;

use crate::ClockConfig;

/// Validate that every duration in a clock configuration is a finite number.
///
/// Range checks let `NaN` through, and `Duration::from_secs_f64` panics on it.
pub fn validate_finite_durations(config: &ClockConfig) -> Result<(), ValidationError> {
    let finite = config.passthrough_threshold_secs.is_finite()
        && config.increment_secs.is_finite()
        && config.step_pause_secs.map_or(true, f64::is_finite);
    if finite {
        Ok(())
    } else {
        Err(ValidationError::new("non_finite_duration"))
    }
}

/// Validate a `tracing` level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
