#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use threadsleep_simulator::{Scenario, ScenarioRunner};

const SCENARIO: &str = r#"
name: bench
clock: { mode: jump }
sleepers:
  - { label: a, after_secs: 1, repeat: 10 }
  - { label: b, after_secs: 3, repeat: 3 }
steps:
  - { advance_secs: 1 }
  - { advance_secs: 1 }
  - { advance_secs: 1 }
  - { advance_secs: 1 }
  - { advance_secs: 1 }
  - { advance_secs: 1 }
  - { advance_secs: 1 }
  - { advance_secs: 1 }
  - { advance_secs: 1 }
  - { advance_secs: 1 }
"#;

/// End-to-end replay cost: thread spawn, every step's rendezvous, teardown.
fn benchmark_replay(c: &mut Criterion) {
    let scenario = Scenario::from_yaml_str(SCENARIO).expect("bench scenario parses");
    let runner = ScenarioRunner::new();

    c.bench_function("replay_two_periodic_sleepers", |b| {
        b.iter(|| black_box(runner.run(&scenario).expect("replay succeeds")))
    });
}

criterion_group!(benches, benchmark_replay);
criterion_main!(benches);
