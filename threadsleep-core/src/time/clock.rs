//! # Virtual Clock
//!
//! A test-controlled clock that parks sleeping threads until the test
//! advances simulated time past their target.
//!
//! ## Guarantees:
//! - Time and registrations are only touched under a single exclusive lock
//! - A sleeper never holds that lock while parked
//! - After `advance` returns, no registration is due (within tolerance)
//! - A released sleeper observes `now >= wake_at` (within tolerance)
//! - Virtual time saturates at `Duration::MAX` instead of overflowing

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use threadsleep_config::{ClockConfig, ClockMode};
use threadsleep_telemetry::ClockMetrics;
use tracing::{debug, trace, warn};
use validator::Validate;

use super::registration::{SleepRegistration, WakeReason, WakeSignal};
use super::sleeper::{Sleeper, SystemSleeper};
use crate::error::ClockError;

/// Default step size of the fine-grained variant.
pub const DEFAULT_INCREMENT: Duration = Duration::from_millis(100);

/// Sleeps shorter than this pass through to the real primitive by default.
pub const DEFAULT_PASSTHROUGH_THRESHOLD: Duration = Duration::from_secs(1);

/// How long a stepped advance waits for released threads to resume.
pub const DEFAULT_RESUME_TIMEOUT: Duration = Duration::from_millis(50);

/// Due-comparison slack for the jump variant; absorbs `f64` to nanosecond rounding.
const JUMP_TOLERANCE: Duration = Duration::from_micros(1);

/// How an `advance` call moves time forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceMode {
    /// One atomic bump followed by a single release pass.
    Jump,
    /// Repeated bumps of `increment`, releasing the lock and pausing for
    /// `pause` between bumps so released workers can re-register.
    Stepped { increment: Duration, pause: Duration },
}

impl AdvanceMode {
    /// Stepped mode with the default pause of `increment / 10_000`.
    pub fn stepped(increment: Duration) -> Self {
        Self::Stepped {
            increment,
            pause: increment / 10_000,
        }
    }

    /// Tolerance used for due checks and time assertions.
    pub fn tolerance(&self) -> Duration {
        match *self {
            Self::Jump => JUMP_TOLERANCE,
            Self::Stepped { increment, .. } => increment / 100,
        }
    }
}

impl Default for AdvanceMode {
    fn default() -> Self {
        Self::stepped(DEFAULT_INCREMENT)
    }
}

/// How a [`VirtualClock::sleep`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// Below the threshold; the real primitive handled it.
    Passthrough,
    /// An advance reached `target`; `at` is the virtual time of release.
    Reached { target: Duration, at: Duration },
    /// `unblock_all` released the sleeper before `target` was reached.
    Released { target: Duration, at: Duration },
}

struct ClockState {
    now: Duration,
    registrations: Vec<SleepRegistration>,
    next_id: u64,
    unblocked: bool,
}

struct Inner {
    state: Mutex<ClockState>,
    mode: AdvanceMode,
    threshold: Duration,
    resume_timeout: Duration,
    passthrough: Arc<dyn Sleeper>,
    metrics: Option<ClockMetrics>,
}

/// Shared handle to a virtual clock. Clones refer to the same clock.
#[derive(Clone)]
pub struct VirtualClock {
    inner: Arc<Inner>,
}

/// Builder for [`VirtualClock`].
pub struct VirtualClockBuilder {
    mode: AdvanceMode,
    threshold: Duration,
    resume_timeout: Duration,
    passthrough: Arc<dyn Sleeper>,
    metrics: Option<ClockMetrics>,
}

impl Default for VirtualClockBuilder {
    fn default() -> Self {
        Self {
            mode: AdvanceMode::default(),
            threshold: DEFAULT_PASSTHROUGH_THRESHOLD,
            resume_timeout: DEFAULT_RESUME_TIMEOUT,
            passthrough: Arc::new(SystemSleeper),
            metrics: None,
        }
    }
}

impl VirtualClockBuilder {
    /// Starts from validated configuration; the passthrough stays `SystemSleeper`.
    pub fn from_config(config: &ClockConfig) -> Result<Self, ClockError> {
        config
            .validate()
            .map_err(threadsleep_config::ConfigError::from)?;

        let mode = match config.mode {
            ClockMode::Jump => AdvanceMode::Jump,
            ClockMode::Stepped => AdvanceMode::Stepped {
                increment: config.increment(),
                pause: config.step_pause(),
            },
        };

        Ok(Self::default()
            .mode(mode)
            .passthrough_threshold(config.passthrough_threshold())
            .resume_timeout(config.resume_timeout()))
    }

    pub fn mode(mut self, mode: AdvanceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sleeps strictly shorter than `threshold` bypass the clock.
    pub fn passthrough_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn resume_timeout(mut self, timeout: Duration) -> Self {
        self.resume_timeout = timeout;
        self
    }

    /// The real primitive used for passthrough. Captured once, here.
    pub fn passthrough(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.passthrough = sleeper;
        self
    }

    pub fn metrics(mut self, metrics: ClockMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> VirtualClock {
        VirtualClock {
            inner: Arc::new(Inner {
                state: Mutex::new(ClockState {
                    now: Duration::ZERO,
                    registrations: Vec::new(),
                    next_id: 0,
                    unblocked: false,
                }),
                mode: self.mode,
                threshold: self.threshold,
                resume_timeout: self.resume_timeout,
                passthrough: self.passthrough,
                metrics: self.metrics,
            }),
        }
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock {
    /// Fine-grained clock with the default increment and threshold.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Simple clock: every advance is a single atomic jump.
    pub fn jump() -> Self {
        Self::builder().mode(AdvanceMode::Jump).build()
    }

    pub fn builder() -> VirtualClockBuilder {
        VirtualClockBuilder::default()
    }

    /// Builds a clock from validated configuration.
    pub fn from_config(config: &ClockConfig) -> Result<Self, ClockError> {
        Ok(VirtualClockBuilder::from_config(config)?.build())
    }

    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> Duration {
        self.inner.state.lock().now
    }

    /// Number of sleepers currently parked on the clock.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().registrations.len()
    }

    /// Whether `unblock_all` has been called.
    pub fn is_unblocked(&self) -> bool {
        self.inner.state.lock().unblocked
    }

    #[inline]
    pub fn mode(&self) -> AdvanceMode {
        self.inner.mode
    }

    #[inline]
    pub fn tolerance(&self) -> Duration {
        self.inner.mode.tolerance()
    }

    #[inline]
    pub fn passthrough_threshold(&self) -> Duration {
        self.inner.threshold
    }

    /// Blocks the calling thread until the clock has been advanced by `duration`.
    ///
    /// Durations below the passthrough threshold are handed to the real
    /// primitive instead. Fails fast once `unblock_all` has been called.
    pub fn sleep(&self, duration: Duration) -> Result<Wakeup, ClockError> {
        if duration < self.inner.threshold || duration.is_zero() {
            trace!(?duration, "passthrough sleep");
            if let Some(metrics) = &self.inner.metrics {
                metrics.inc_passthrough();
            }
            self.inner.passthrough.sleep(duration)?;
            return Ok(Wakeup::Passthrough);
        }

        let (target, signal) = {
            let mut state = self.inner.state.lock();
            if state.unblocked {
                warn!(?duration, "sleep requested after unblock_all");
                return Err(ClockError::SleepAfterUnblock {
                    requested: duration,
                });
            }

            let wake_at = state.now.saturating_add(duration);
            let id = state.next_id;
            state.next_id += 1;

            let signal = Arc::new(WakeSignal::default());
            state
                .registrations
                .push(SleepRegistration::new(id, wake_at, Arc::clone(&signal)));

            if let Some(metrics) = &self.inner.metrics {
                metrics.inc_registered();
                metrics.set_pending(state.registrations.len());
            }
            trace!(id, ?wake_at, now = ?state.now, "sleep registered");
            (wake_at, signal)
        };

        let release = signal.wait();
        Ok(match release.reason {
            WakeReason::Reached => Wakeup::Reached {
                target,
                at: release.at,
            },
            WakeReason::Released => Wakeup::Released {
                target,
                at: release.at,
            },
        })
    }

    /// Moves virtual time forward by exactly `duration` and releases every
    /// sleeper whose target has been reached. Returns how many were released.
    pub fn advance(&self, duration: Duration) -> usize {
        if let Some(metrics) = &self.inner.metrics {
            metrics.inc_advances();
        }

        let released = match self.inner.mode {
            AdvanceMode::Jump => {
                let mut state = self.inner.state.lock();
                state.now = state.now.saturating_add(duration);
                self.release_due(&mut state).len()
            }
            AdvanceMode::Stepped { increment, pause } => {
                self.advance_stepped(duration, increment, pause)
            }
        };

        debug!(?duration, released, "advanced");
        released
    }

    fn advance_stepped(&self, duration: Duration, increment: Duration, pause: Duration) -> usize {
        let increment = increment.max(Duration::from_nanos(1));
        let tolerance = self.tolerance();
        let mut remaining = duration;
        let mut released_total = 0;

        loop {
            // Fold a sub-tolerance tail into the last step.
            let step = if remaining <= increment.saturating_add(tolerance) {
                remaining
            } else {
                increment
            };

            let released = {
                let mut state = self.inner.state.lock();
                state.now = state.now.saturating_add(step);
                self.release_due(&mut state)
            };
            remaining -= step;
            released_total += released.len();

            self.settle(&released, pause);

            if remaining.is_zero() {
                break;
            }
        }

        released_total
    }

    /// Gives released workers a chance to run and re-register before the
    /// next step. Runs without the clock lock held.
    fn settle(&self, released: &[Arc<WakeSignal>], pause: Duration) {
        for signal in released {
            if !signal.wait_resumed(self.inner.resume_timeout) {
                warn!(
                    timeout = ?self.inner.resume_timeout,
                    "released sleeper did not resume in time"
                );
            }
        }

        if pause.is_zero() {
            std::thread::yield_now();
        } else {
            std::thread::sleep(pause);
        }
    }

    /// Stage-then-clear: collect due registrations, signal them in target
    /// order, then drop them by id. Caller holds the lock.
    fn release_due(&self, state: &mut ClockState) -> Vec<Arc<WakeSignal>> {
        let now = state.now;
        let horizon = now.saturating_add(self.tolerance());

        let mut due: Vec<&SleepRegistration> = state
            .registrations
            .iter()
            .filter(|registration| registration.wake_at() <= horizon)
            .collect();
        if due.is_empty() {
            return Vec::new();
        }
        due.sort_by_key(|registration| (registration.wake_at(), registration.id()));

        let mut ids = HashSet::with_capacity(due.len());
        let mut signals = Vec::with_capacity(due.len());
        for registration in due {
            debug!(id = registration.id(), wake_at = ?registration.wake_at(), ?now, "releasing sleeper");
            signals.push(registration.release(WakeReason::Reached, now));
            ids.insert(registration.id());
        }
        state
            .registrations
            .retain(|registration| !ids.contains(&registration.id()));

        if let Some(metrics) = &self.inner.metrics {
            metrics.inc_wakeups(signals.len() as u64);
            metrics.set_pending(state.registrations.len());
        }
        signals
    }

    /// Releases every parked sleeper regardless of target and rejects any
    /// later sleep. Meant for teardown. Returns how many were released.
    pub fn unblock_all(&self) -> usize {
        let mut state = self.inner.state.lock();
        let now = state.now;
        let released = state.registrations.len();
        for registration in state.registrations.drain(..) {
            registration.release(WakeReason::Released, now);
        }
        state.unblocked = true;

        if let Some(metrics) = &self.inner.metrics {
            metrics.inc_wakeups(released as u64);
            metrics.set_pending(0);
        }
        debug!(released, ?now, "unblocked all sleepers");
        released
    }

    /// Compares the current time with `expected` within the clock tolerance.
    pub fn check_current_time(&self, expected: Duration) -> Result<(), ClockError> {
        let actual = self.now();
        if actual.abs_diff(expected) <= self.tolerance() {
            Ok(())
        } else {
            Err(ClockError::TimeMismatch { expected, actual })
        }
    }

    /// Panics unless the current time equals `expected` within tolerance.
    #[track_caller]
    pub fn assert_current_time(&self, expected: Duration) {
        if let Err(err) = self.check_current_time(expected) {
            panic!("{err}");
        }
    }
}

impl Sleeper for VirtualClock {
    fn sleep(&self, duration: Duration) -> Result<(), ClockError> {
        VirtualClock::sleep(self, duration).map(drop)
    }
}

impl std::fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("VirtualClock")
            .field("now", &state.now)
            .field("pending", &state.registrations.len())
            .field("unblocked", &state.unblocked)
            .field("mode", &self.inner.mode)
            .field("threshold", &self.inner.threshold)
            .finish()
    }
}
