//! Pending sleep registrations and the one-shot signal a parked thread waits on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Why a parked sleeper was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// An advance moved the clock to (or past) the registration's target.
    Reached,
    /// `unblock_all` released the sleeper regardless of its target.
    Released,
}

/// Snapshot delivered to the parked thread when its signal fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Release {
    pub(crate) reason: WakeReason,
    /// Virtual time at the moment the signal fired.
    pub(crate) at: Duration,
}

#[derive(Default)]
struct SignalState {
    release: Option<Release>,
    resumed: bool,
}

/// One waiter, one notifier. The first `notify` wins; later ones are ignored.
#[derive(Default)]
pub(crate) struct WakeSignal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

impl WakeSignal {
    pub(crate) fn notify(&self, release: Release) {
        let mut state = self.state.lock();
        if state.release.is_none() {
            state.release = Some(release);
            self.cond.notify_all();
        }
    }

    /// Parks until notified, then marks the waiter as resumed.
    pub(crate) fn wait(&self) -> Release {
        let mut state = self.state.lock();
        let release = loop {
            if let Some(release) = state.release {
                break release;
            }
            self.cond.wait(&mut state);
        };
        state.resumed = true;
        self.cond.notify_all();
        release
    }

    /// Blocks until the parked thread has returned from [`WakeSignal::wait`],
    /// or `timeout` elapses. Returns whether it resumed in time.
    pub(crate) fn wait_resumed(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        while !state.resumed {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut state, deadline).timed_out() {
                        return state.resumed;
                    }
                }
                None => self.cond.wait(&mut state),
            }
        }
        true
    }
}

/// A pending request to release one parked thread at `wake_at`.
///
/// Owned by the clock; dropped as soon as it has been signaled.
pub struct SleepRegistration {
    id: u64,
    wake_at: Duration,
    signal: Arc<WakeSignal>,
}

impl SleepRegistration {
    pub(crate) fn new(id: u64, wake_at: Duration, signal: Arc<WakeSignal>) -> Self {
        Self {
            id,
            wake_at,
            signal,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Absolute virtual time at or after which this registration is due.
    #[inline]
    pub fn wake_at(&self) -> Duration {
        self.wake_at
    }

    /// Fires the signal and hands back a handle so the caller can rendezvous
    /// with the resumed thread.
    pub(crate) fn release(&self, reason: WakeReason, at: Duration) -> Arc<WakeSignal> {
        self.signal.notify(Release { reason, at });
        Arc::clone(&self.signal)
    }
}

impl std::fmt::Debug for SleepRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SleepRegistration")
            .field("id", &self.id)
            .field("wake_at", &self.wake_at)
            .finish()
    }
}
