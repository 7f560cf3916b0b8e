//! Background workers that sleep through an injected [`Sleeper`].
//!
//! These are the shapes of time-dependent code that tests typically drive:
//! a one-off delayed callback, a poller waiting for a condition, and a
//! periodic job. Each runs on its own named thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use threadsleep_core::{ClockError, Sleeper};
use tracing::debug;

/// Handle to a spawned worker thread.
pub struct Worker {
    name: String,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<(), ClockError>>,
}

impl Worker {
    fn spawn<F>(name: String, body: F) -> io::Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) -> Result<(), ClockError> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name(name.clone())
                .spawn(move || body(stop))?
        };
        Ok(Self { name, stop, handle })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the worker to exit at its next check. Does not interrupt a sleep.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread to exit. A panic inside the worker is re-raised here.
    pub fn join(self) -> Result<(), ClockError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Sleeps once, then runs a callback.
pub struct DelayedCallback<S> {
    sleeper: S,
    delay: Duration,
}

impl<S: Sleeper + 'static> DelayedCallback<S> {
    pub fn new(sleeper: S, delay: Duration) -> Self {
        Self { sleeper, delay }
    }

    pub fn spawn<F>(self, callback: F) -> io::Result<Worker>
    where
        F: FnOnce() + Send + 'static,
    {
        Worker::spawn("delayed-callback".into(), move |stop| {
            self.sleeper.sleep(self.delay)?;
            if !stop.load(Ordering::Acquire) {
                callback();
            }
            Ok(())
        })
    }
}

/// Checks a predicate, sleeping `interval` between tries, and runs the
/// callback once the predicate holds.
pub struct ConditionPoller<S> {
    sleeper: S,
    interval: Duration,
}

impl<S: Sleeper + 'static> ConditionPoller<S> {
    pub fn new(sleeper: S, interval: Duration) -> Self {
        Self { sleeper, interval }
    }

    pub fn spawn<P, F>(self, mut probe: P, callback: F) -> io::Result<Worker>
    where
        P: FnMut() -> bool + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        Worker::spawn("condition-poller".into(), move |stop| {
            while !probe() {
                if stop.load(Ordering::Acquire) {
                    debug!("poller stopped before condition held");
                    return Ok(());
                }
                self.sleeper.sleep(self.interval)?;
            }
            callback();
            Ok(())
        })
    }
}

/// Runs `on_tick` after every `period`, until stopped, out of ticks, or the
/// clock refuses further sleeps after teardown.
///
/// Call [`Worker::stop`] before `unblock_all`, otherwise the released sleep
/// is reported as one last tick.
pub struct PeriodicWorker<S> {
    sleeper: S,
    period: Duration,
    max_ticks: Option<u64>,
}

impl<S: Sleeper + 'static> PeriodicWorker<S> {
    pub fn new(sleeper: S, period: Duration) -> Self {
        Self {
            sleeper,
            period,
            max_ticks: None,
        }
    }

    pub fn max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn spawn<F>(self, mut on_tick: F) -> io::Result<Worker>
    where
        F: FnMut(u64) + Send + 'static,
    {
        Worker::spawn("periodic-worker".into(), move |stop| {
            let mut tick = 0;
            while self.max_ticks.map_or(true, |max| tick < max) {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                match self.sleeper.sleep(self.period) {
                    Ok(()) => {}
                    Err(ClockError::SleepAfterUnblock { .. }) => {
                        debug!(tick, "clock torn down, periodic worker exiting");
                        break;
                    }
                    Err(err) => return Err(err),
                }
                if stop.load(Ordering::Acquire) {
                    break;
                }
                tick += 1;
                on_tick(tick);
            }
            Ok(())
        })
    }
}
