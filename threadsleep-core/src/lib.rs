//! # threadsleep-core
//!
//! Deterministic control over time for threaded code under test.
//!
//! Worker threads sleep through a [`Sleeper`]; in tests that sleeper is a
//! [`VirtualClock`], which parks each sleeping thread until the test advances
//! simulated time far enough. A [`CompletionLatch`] lets the test observe when
//! the released work has finished.
//!
//! ### Key Submodules:
//! - `time`: `VirtualClock`, registrations and the `Sleeper` seam
//! - `latch`: one-shot completion signal with timed assertions
//! - `error`: clock and latch error types

pub mod error;
pub mod latch;
pub mod time;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::latch::*;
    pub use crate::time::*;
}

pub use error::{ClockError, LatchError};
pub use latch::CompletionLatch;
pub use time::{AdvanceMode, Sleeper, SystemSleeper, VirtualClock, VirtualClockBuilder, Wakeup};
