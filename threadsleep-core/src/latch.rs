//! One-shot completion latch.
//!
//! Application code signals it (usually as a callback) when asynchronous work
//! is done; the test thread waits on it with a timeout instead of racing the
//! worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::LatchError;

#[derive(Default)]
struct LatchInner {
    set: Mutex<bool>,
    cond: Condvar,
}

/// Thread-safe, settable-once signal. Clones share the same state.
#[derive(Clone, Default)]
pub struct CompletionLatch {
    inner: Arc<LatchInner>,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch and releases every waiter. Idempotent.
    pub fn signal(&self) {
        let mut set = self.inner.set.lock();
        if !*set {
            *set = true;
            self.inner.cond.notify_all();
        }
    }

    #[inline]
    pub fn is_signaled(&self) -> bool {
        *self.inner.set.lock()
    }

    /// Blocks until signaled or `timeout` elapses. Returns whether it was set.
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub fn wait_within(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut set = self.inner.set.lock();
        while !*set {
            match deadline {
                Some(deadline) => {
                    if self.inner.cond.wait_until(&mut set, deadline).timed_out() {
                        return *set;
                    }
                }
                None => self.inner.cond.wait(&mut set),
            }
        }
        true
    }

    /// Wraps the latch as a callback for code that expects `FnOnce()`.
    pub fn callback(&self) -> impl FnOnce() + Send + 'static {
        let latch = self.clone();
        move || latch.signal()
    }

    pub fn check_already_signaled(&self) -> Result<(), LatchError> {
        if self.is_signaled() {
            Ok(())
        } else {
            Err(LatchError::NotYetSignaled)
        }
    }

    pub fn check_not_yet_signaled(&self) -> Result<(), LatchError> {
        if self.is_signaled() {
            Err(LatchError::UnexpectedlySignaled)
        } else {
            Ok(())
        }
    }

    pub fn check_signaled_within(&self, timeout: Duration) -> Result<(), LatchError> {
        if self.wait_within(timeout) {
            Ok(())
        } else {
            Err(LatchError::NeverSignaled)
        }
    }

    /// Always waits out the full `timeout`: absence of a signal can only be
    /// confirmed by waiting for it.
    pub fn check_not_signaled_within(&self, timeout: Duration) -> Result<(), LatchError> {
        if self.wait_within(timeout) {
            Err(LatchError::UnexpectedlySignaled)
        } else {
            Ok(())
        }
    }

    #[track_caller]
    pub fn assert_already_signaled(&self) {
        if let Err(err) = self.check_already_signaled() {
            panic!("{err}");
        }
    }

    #[track_caller]
    pub fn assert_not_yet_signaled(&self) {
        if let Err(err) = self.check_not_yet_signaled() {
            panic!("{err}");
        }
    }

    #[track_caller]
    pub fn assert_signaled_within(&self, timeout: Duration) {
        if let Err(err) = self.check_signaled_within(timeout) {
            panic!("{err} within {timeout:?}");
        }
    }

    /// Blocks for the full `timeout` even when the assertion holds.
    #[track_caller]
    pub fn assert_not_signaled_within(&self, timeout: Duration) {
        if let Err(err) = self.check_not_signaled_within(timeout) {
            panic!("{err}");
        }
    }
}

impl std::fmt::Debug for CompletionLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionLatch")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}
