//! The blocking-sleep seam.
//!
//! Code that needs to wait for a real-world duration takes a [`Sleeper`]
//! instead of calling `std::thread::sleep` directly. Production wiring hands it
//! a [`SystemSleeper`]; tests hand it a [`VirtualClock`](super::VirtualClock).

use std::sync::Arc;
use std::time::Duration;

use crate::error::ClockError;

/// Anything that can block the calling thread for a duration.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Result<(), ClockError>;
}

/// Real sleeps via `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSleeper;

impl Sleeper for SystemSleeper {
    #[inline]
    fn sleep(&self, duration: Duration) -> Result<(), ClockError> {
        std::thread::sleep(duration);
        Ok(())
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    #[inline]
    fn sleep(&self, duration: Duration) -> Result<(), ClockError> {
        (**self).sleep(duration)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    #[inline]
    fn sleep(&self, duration: Duration) -> Result<(), ClockError> {
        (**self).sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn system_sleeper_blocks_for_real() {
        let start = Instant::now();
        SystemSleeper.sleep(Duration::from_millis(20)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn shared_sleeper_is_a_sleeper() {
        let shared: Arc<dyn Sleeper> = Arc::new(SystemSleeper);
        shared.sleep(Duration::ZERO).unwrap();
    }
}
