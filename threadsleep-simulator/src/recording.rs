//! A passthrough stand-in that remembers what it was asked to do.
//!
//! Hand it to `VirtualClockBuilder::passthrough` to check which sleeps
//! bypassed the virtual clock.

use std::time::Duration;

use parking_lot::Mutex;
use threadsleep_core::{ClockError, Sleeper};

#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
    forward: bool,
}

impl RecordingSleeper {
    /// Records calls and returns immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls and also sleeps for real.
    pub fn forwarding() -> Self {
        Self {
            forward: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    #[track_caller]
    pub fn assert_called_once_with(&self, expected: Duration) {
        let calls = self.calls();
        assert_eq!(
            calls,
            vec![expected],
            "expected exactly one passthrough of {expected:?}"
        );
    }

    #[track_caller]
    pub fn assert_not_called(&self) {
        let calls = self.calls();
        assert!(calls.is_empty(), "expected no passthrough, got {calls:?}");
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), ClockError> {
        self.calls.lock().push(duration);
        if self.forward {
            std::thread::sleep(duration);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_millis(3)).unwrap();
        sleeper.sleep(Duration::from_millis(1)).unwrap();
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_millis(3), Duration::from_millis(1)]
        );
    }

    #[test]
    #[should_panic(expected = "expected no passthrough")]
    fn assert_not_called_fails_after_a_call() {
        let sleeper = RecordingSleeper::forwarding();
        sleeper.sleep(Duration::from_millis(1)).unwrap();
        sleeper.assert_not_called();
    }
}
