//! ## threadsleep-core::time
//! **Virtual clock and sleep registration**
//!
//! ### Key pieces:
//! - `clock`: `VirtualClock`, advanced explicitly by the test thread
//! - `registration`: pending sleeps and the one-shot signal each sleeper parks on
//! - `sleeper`: the `Sleeper` seam code under test depends on

pub mod clock;
pub mod registration;
pub mod sleeper;

pub use clock::{AdvanceMode, VirtualClock, VirtualClockBuilder, Wakeup};
pub use registration::{SleepRegistration, WakeReason};
pub use sleeper::{Sleeper, SystemSleeper};
