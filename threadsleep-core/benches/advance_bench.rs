#[macro_use]
extern crate criterion;

use std::time::Duration;

use criterion::{black_box, Criterion};
use threadsleep_core::{AdvanceMode, VirtualClock};

/// Cost of moving an idle clock forward, per mode.
fn bench_idle_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("idle_advance");

    group.bench_function("jump_10s", |b| {
        let clock = VirtualClock::jump();
        b.iter(|| black_box(clock.advance(Duration::from_secs(10))));
    });

    group.bench_function("stepped_10s_no_pause", |b| {
        let clock = VirtualClock::builder()
            .mode(AdvanceMode::Stepped {
                increment: Duration::from_millis(100),
                pause: Duration::ZERO,
            })
            .build();
        b.iter(|| black_box(clock.advance(Duration::from_secs(10))));
    });

    group.finish();
}

criterion_group!(benches, bench_idle_advance);
criterion_main!(benches);
