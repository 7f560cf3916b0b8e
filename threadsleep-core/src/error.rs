use std::time::Duration;

use thiserror::Error;
use threadsleep_config::ConfigError;

/// Errors raised by the virtual clock.
#[derive(Debug, Error)]
pub enum ClockError {
    /// A sleep was requested after `unblock_all` released everything.
    #[error("cannot sleep for {requested:?} after calling `unblock_all`; only use it for teardown")]
    SleepAfterUnblock { requested: Duration },

    /// `check_current_time` found the clock outside the tolerance of `expected`.
    #[error("current time should be {expected:?} but is {actual:?}")]
    TimeMismatch { expected: Duration, actual: Duration },

    /// The configuration a clock was built from failed validation.
    #[error("clock configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failed expectations on a [`CompletionLatch`](crate::latch::CompletionLatch).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LatchError {
    #[error("latch was never signaled")]
    NeverSignaled,

    #[error("latch was not yet signaled")]
    NotYetSignaled,

    #[error("latch shouldn't have been signaled, but was")]
    UnexpectedlySignaled,
}
