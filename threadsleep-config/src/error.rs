//! Error types for configuration loading and validation

use std::path::PathBuf;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found error.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Configuration validation error.
    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    /// Figment parsing error.
    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut output = String::new();
    write_validation_errors(&mut output, "", errors);
    output
}

fn write_validation_errors(output: &mut String, prefix: &str, errors: &ValidationErrors) {
    use std::fmt::Write;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errors) => {
                let _ = writeln!(output, "Field '{}':", path);
                for error in errors {
                    let message = match &error.message {
                        Some(msg) => msg.to_string(),
                        None => error.code.to_string(),
                    };
                    let _ = writeln!(output, "  - {}", message);
                }
            }
            ValidationErrorsKind::Struct(inner) => write_validation_errors(output, &path, inner),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    write_validation_errors(output, &format!("{path}[{index}]"), inner);
                }
            }
        }
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThreadsleepConfig;
    use validator::Validate;

    #[test]
    fn nested_errors_name_the_full_path() {
        let mut config = ThreadsleepConfig::default();
        config.telemetry.log_level = "loud".into();
        config.clock.increment_secs = 0.0;

        let err = ConfigError::from(config.validate().unwrap_err());
        let text = err.to_string();
        assert!(text.contains("Field 'telemetry.log_level':"));
        assert!(text.contains("invalid_log_level"));
        assert!(text.contains("Field 'clock.increment_secs':"));
    }
}
