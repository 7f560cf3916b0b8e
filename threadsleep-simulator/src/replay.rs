//! Replay module.
//!
//! Runs a [`Scenario`] against a fresh virtual clock: one thread per
//! sleeper, one `advance` per step. After each step the runner waits for
//! every sleeper the clock released to report back, and for repeating
//! sleepers to park again, before checking expectations. The resulting wake
//! trace is hashed with BLAKE3 so runs can be compared.

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use blake3::Hasher;
use threadsleep_config::ClockConfig;
use threadsleep_core::time::VirtualClockBuilder;
use threadsleep_core::{VirtualClock, Wakeup};
use threadsleep_telemetry::{ClockLogger, ClockMetrics};
use tracing::{debug, info, warn};

use crate::error::ScenarioError;
use crate::scenario::{Scenario, SleeperSpec};

/// Real-time budget for sleepers to register or report back.
pub const DEFAULT_WAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// One release observed during a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeRecord {
    /// 1-based index of the step whose advance released the sleeper.
    pub step: usize,
    pub label: String,
    pub target: Duration,
    /// Virtual time at release.
    pub at: Duration,
}

#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub name: String,
    /// The clock the scenario ran on, after its overrides were applied.
    pub clock: ClockConfig,
    pub final_time: Duration,
    pub trace: Vec<WakeRecord>,
    /// Hex-encoded BLAKE3 hash of the trace and final time.
    pub hash: String,
}

impl ReplayReport {
    pub fn validate_hash(&self, expected: &str) -> Result<(), ScenarioError> {
        if self.hash.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(ScenarioError::HashMismatch {
                expected: expected.to_string(),
                actual: self.hash.clone(),
            })
        }
    }

    /// Labels in release order.
    pub fn wake_order(&self) -> Vec<&str> {
        self.trace.iter().map(|record| record.label.as_str()).collect()
    }
}

struct Woken {
    label: String,
    target: Duration,
    at: Duration,
}

pub struct ScenarioRunner {
    base: ClockConfig,
    wake_timeout: Duration,
    metrics: Option<ClockMetrics>,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self {
            base: ClockConfig::default(),
            wake_timeout: DEFAULT_WAKE_TIMEOUT,
            metrics: None,
        }
    }

    /// Clock configuration a scenario's `clock:` block is layered over.
    pub fn clock(mut self, base: ClockConfig) -> Self {
        self.base = base;
        self
    }

    pub fn wake_timeout(mut self, timeout: Duration) -> Self {
        self.wake_timeout = timeout;
        self
    }

    pub fn metrics(mut self, metrics: ClockMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replays `scenario`. The clock is always torn down with `unblock_all`,
    /// even when a step fails.
    pub fn run(&self, scenario: &Scenario) -> Result<ReplayReport, ScenarioError> {
        let span = ClockLogger::run_span(&scenario.name);
        let _entered = span.enter();

        scenario.check()?;
        let config = scenario.clock_config(&self.base);
        let mut builder = VirtualClockBuilder::from_config(&config)?;
        scenario.check_clock(&config)?;

        if let Some(metrics) = &self.metrics {
            builder = builder.metrics(metrics.clone());
        }
        let clock = builder.build();
        let _teardown = UnblockOnDrop(&clock);

        let (tx, rx) = mpsc::channel();
        let mut sleepers = Vec::with_capacity(scenario.sleepers.len());
        let outcome = spawn_sleepers(&clock, &scenario.sleepers, &tx, &mut sleepers)
            .and_then(|()| {
                drop(tx);
                self.drive(scenario, config, &clock, &rx)
            });

        let released = clock.unblock_all();
        debug!(released, "scenario torn down");
        for sleeper in sleepers {
            if sleeper.join().is_err() {
                warn!("sleeper thread panicked");
            }
        }

        let report = outcome?;
        info!(hash = %report.hash, final_time = ?report.final_time, "scenario replayed");
        Ok(report)
    }

    fn drive(
        &self,
        scenario: &Scenario,
        config: ClockConfig,
        clock: &VirtualClock,
        rx: &Receiver<Woken>,
    ) -> Result<ReplayReport, ScenarioError> {
        let mut remaining: HashMap<&str, u32> = scenario
            .sleepers
            .iter()
            .map(|sleeper| (sleeper.label.as_str(), sleeper.repeat))
            .collect();
        self.await_pending(clock, scenario.sleepers.len(), 0)?;

        let mut trace = Vec::new();
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_no = index + 1;
            let released = clock.advance(step.advance());

            let mut woken = self.collect_wakes(rx, released, step_no)?;
            for record in &woken {
                if let Some(left) = remaining.get_mut(record.label.as_str()) {
                    *left = left.saturating_sub(1);
                }
            }
            let expected_pending = remaining.values().filter(|left| **left > 0).count();
            self.await_pending(clock, expected_pending, step_no)?;

            if let Some(expected) = step.expect_time() {
                clock.check_current_time(expected)?;
            }

            woken.sort_by(|a, b| {
                (a.at, a.target, &a.label).cmp(&(b.at, b.target, &b.label))
            });
            if let Some(expected) = &step.expect_woken {
                let mut expected = expected.clone();
                expected.sort();
                let mut actual: Vec<String> =
                    woken.iter().map(|record| record.label.clone()).collect();
                actual.sort();
                if expected != actual {
                    return Err(ScenarioError::UnexpectedWakes {
                        step: step_no,
                        expected,
                        actual,
                    });
                }
            }

            debug!(step = step_no, released, now = ?clock.now(), "step complete");
            trace.extend(woken.into_iter().map(|record| WakeRecord {
                step: step_no,
                label: record.label,
                target: record.target,
                at: record.at,
            }));
        }

        let final_time = clock.now();
        let hash = trace_hash(&trace, final_time);
        Ok(ReplayReport {
            name: scenario.name.clone(),
            clock: config,
            final_time,
            trace,
            hash,
        })
    }

    fn collect_wakes(
        &self,
        rx: &Receiver<Woken>,
        expected: usize,
        step: usize,
    ) -> Result<Vec<Woken>, ScenarioError> {
        let deadline = Instant::now() + self.wake_timeout;
        let mut woken = Vec::with_capacity(expected);
        while woken.len() < expected {
            let left = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(left) {
                Ok(record) => woken.push(record),
                Err(_) => {
                    return Err(ScenarioError::WakeTimeout {
                        step,
                        expected,
                        received: woken.len(),
                    })
                }
            }
        }
        Ok(woken)
    }

    fn await_pending(
        &self,
        clock: &VirtualClock,
        expected: usize,
        step: usize,
    ) -> Result<(), ScenarioError> {
        let deadline = Instant::now() + self.wake_timeout;
        loop {
            let pending = clock.pending();
            if pending == expected {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScenarioError::RegistrationTimeout {
                    step,
                    expected,
                    pending,
                });
            }
            thread::yield_now();
        }
    }
}

/// Releases parked sleepers if a step panics before the normal teardown.
struct UnblockOnDrop<'a>(&'a VirtualClock);

impl Drop for UnblockOnDrop<'_> {
    fn drop(&mut self) {
        self.0.unblock_all();
    }
}

fn spawn_sleepers(
    clock: &VirtualClock,
    specs: &[SleeperSpec],
    tx: &Sender<Woken>,
    handles: &mut Vec<JoinHandle<()>>,
) -> Result<(), ScenarioError> {
    for sleeper in specs {
        let clock = clock.clone();
        let tx = tx.clone();
        let spec = sleeper.clone();
        let handle = thread::Builder::new()
            .name(format!("sleeper-{}", spec.label))
            .spawn(move || {
                for _ in 0..spec.repeat {
                    match clock.sleep(spec.after()) {
                        Ok(Wakeup::Reached { target, at }) => {
                            let woken = Woken {
                                label: spec.label.clone(),
                                target,
                                at,
                            };
                            if tx.send(woken).is_err() {
                                break;
                            }
                        }
                        Ok(_) => break,
                        Err(err) => {
                            debug!(label = %spec.label, %err, "sleeper stopped");
                            break;
                        }
                    }
                }
            })?;
        handles.push(handle);
    }
    Ok(())
}

fn trace_hash(trace: &[WakeRecord], final_time: Duration) -> String {
    let mut hasher = Hasher::new();
    for record in trace {
        hasher.update(
            format!(
                "{}|{}|{}|{}\n",
                record.step,
                record.label,
                record.target.as_nanos(),
                record.at.as_nanos()
            )
            .as_bytes(),
        );
    }
    hasher.update(format!("end|{}", final_time.as_nanos()).as_bytes());
    hex::encode(hasher.finalize().as_bytes())
}

/// Loads and replays a scenario file, optionally checking its trace hash.
pub fn replay_scenario<P: AsRef<Path>>(
    path: P,
    expected_hash: Option<&str>,
) -> Result<ReplayReport, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let report = ScenarioRunner::new().run(&scenario)?;
    if let Some(expected) = expected_hash {
        report.validate_hash(expected)?;
    }
    Ok(report)
}
