//! ## threadsleep-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! The clock emits `trace!` for registrations and passthroughs, `debug!` for
//! releases and `warn!` for protocol violations. Binaries install a subscriber
//! through [`ClockLogger::init`].

use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct ClockLogger;

impl ClockLogger {
    /// Installs a global fmt subscriber. `RUST_LOG` overrides `default_level`.
    ///
    /// Returns `false` if a subscriber was already installed.
    pub fn init(default_level: &str) -> bool {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .try_init()
            .is_ok()
    }

    /// Span wrapping one scenario or test run.
    pub fn run_span(name: &str) -> tracing::Span {
        info_span!("clock_run", run = name)
    }
}
