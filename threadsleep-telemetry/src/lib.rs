//! # threadsleep Telemetry
//!
//! Logging setup and clock metrics.

pub mod logging;
pub mod metrics;

pub use logging::ClockLogger;
pub use metrics::ClockMetrics;
