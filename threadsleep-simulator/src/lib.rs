/*!
# threadsleep Simulator

Harness scaffolding around the virtual clock: the kinds of worker threads
time-dependent code is made of, a passthrough recorder, and a deterministic
scenario replay engine.

## Key Components:
- **Workers:** delayed callback, condition poller and periodic job, each sleeping through an injected `Sleeper`.
- **Recording Sleeper:** stands in for the real primitive to observe passthrough sleeps.
- **Scenarios:** YAML descriptions of sleepers and advance steps with expectations.
- **Replay Engine:** runs a scenario on a fresh clock and hashes the wake trace.
*/

pub mod error;
pub mod recording;
pub mod replay;
pub mod scenario;
pub mod workers;

pub use error::ScenarioError;
pub use recording::RecordingSleeper;
pub use replay::{replay_scenario, ReplayReport, ScenarioRunner, WakeRecord};
pub use scenario::{Scenario, SleeperSpec, Step};
pub use workers::{ConditionPoller, DelayedCallback, PeriodicWorker, Worker};
