use thiserror::Error;
use threadsleep_core::ClockError;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scenario parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),

    #[error("Invalid scenario fields: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("Step {step}: expected {expected} pending sleepers, found {pending}")]
    RegistrationTimeout {
        step: usize,
        expected: usize,
        pending: usize,
    },

    #[error("Step {step}: clock released {expected} sleepers but only {received} reported back")]
    WakeTimeout {
        step: usize,
        expected: usize,
        received: usize,
    },

    #[error("Step {step}: expected {expected:?} to wake, got {actual:?}")]
    UnexpectedWakes {
        step: usize,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Trace hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}
