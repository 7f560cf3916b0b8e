use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use proptest::prelude::*;
use threadsleep_core::prelude::*;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Passthrough stand-in that records instead of sleeping.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Duration>>,
}

impl Sleeper for Recorder {
    fn sleep(&self, duration: Duration) -> Result<(), ClockError> {
        self.calls.lock().push(duration);
        Ok(())
    }
}

fn wait_for_pending(clock: &VirtualClock, expected: usize) {
    let deadline = Instant::now() + TIMEOUT;
    while clock.pending() != expected {
        assert!(Instant::now() < deadline, "expected {expected} pending sleepers");
        thread::yield_now();
    }
}

fn sleep_then_report(
    clock: &VirtualClock,
    secs: f64,
    tx: mpsc::Sender<(f64, Wakeup)>,
) -> thread::JoinHandle<()> {
    let clock = clock.clone();
    thread::spawn(move || {
        let wakeup = clock.sleep(Duration::from_secs_f64(secs)).unwrap();
        let _ = tx.send((secs, wakeup));
    })
}

fn assert_nothing_woke(rx: &Receiver<(f64, Wakeup)>) {
    assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

fn four_sleepers_wake_in_order(clock: VirtualClock) {
    let (tx, rx) = mpsc::channel();
    let handles: Vec<_> = [1.0, 4.0, 10.0, 15.0]
        .into_iter()
        .map(|secs| sleep_then_report(&clock, secs, tx.clone()))
        .collect();
    wait_for_pending(&clock, 4);
    assert_nothing_woke(&rx);

    for (advance, total, woken) in [(1.0, 1.0, 1.0), (3.0, 4.0, 4.0), (8.5, 12.5, 10.0), (2.5, 15.0, 15.0)] {
        clock.advance(Duration::from_secs_f64(advance));
        clock.assert_current_time(Duration::from_secs_f64(total));

        let (secs, wakeup) = rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(secs, woken);
        match wakeup {
            Wakeup::Reached { target, at } => {
                assert_eq!(target, Duration::from_secs_f64(woken));
                assert!(at + clock.tolerance() >= target);
            }
            other => panic!("unexpected wakeup {other:?}"),
        }
        assert_nothing_woke(&rx);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn four_sleepers_wake_in_order_with_jumps() {
    four_sleepers_wake_in_order(VirtualClock::jump());
}

#[test]
fn four_sleepers_wake_in_order_with_steps() {
    four_sleepers_wake_in_order(VirtualClock::new());
}

#[test]
fn sleeper_of_four_needs_the_full_four() {
    let clock = VirtualClock::new();
    let latch = CompletionLatch::new();
    {
        let clock = clock.clone();
        let latch = latch.clone();
        thread::spawn(move || {
            clock.sleep(Duration::from_secs(4)).unwrap();
            latch.signal();
        });
    }
    wait_for_pending(&clock, 1);

    clock.advance(Duration::from_secs(3));
    clock.assert_current_time(Duration::from_secs(3));
    latch.assert_not_signaled_within(Duration::from_millis(20));

    clock.advance(Duration::from_secs(1));
    clock.assert_current_time(Duration::from_secs(4));
    latch.assert_signaled_within(TIMEOUT);
}

#[test]
fn callback_fires_after_sleep_duration() {
    let clock = VirtualClock::new();
    let latch = CompletionLatch::new();
    let sleep_duration = Duration::from_secs(10);
    {
        let clock = clock.clone();
        let callback = latch.callback();
        thread::spawn(move || {
            clock.sleep(sleep_duration).unwrap();
            callback();
        });
    }

    latch.assert_not_signaled_within(Duration::from_millis(10));
    wait_for_pending(&clock, 1);

    clock.advance(sleep_duration - Duration::from_secs(1));
    clock.assert_current_time(sleep_duration - Duration::from_secs(1));
    latch.assert_not_signaled_within(Duration::from_millis(10));

    clock.advance(Duration::from_secs(1));
    clock.assert_current_time(sleep_duration);
    latch.assert_signaled_within(TIMEOUT);
}

#[test]
fn sub_threshold_sleep_passes_through() {
    let recorder = Arc::new(Recorder::default());
    let clock = VirtualClock::builder().passthrough(recorder.clone()).build();

    let wakeup = clock.sleep(Duration::from_millis(100)).unwrap();
    assert_eq!(wakeup, Wakeup::Passthrough);
    assert_eq!(*recorder.calls.lock(), vec![Duration::from_millis(100)]);
    assert_eq!(clock.pending(), 0);
}

#[test]
fn threshold_sleep_is_captured() {
    let recorder = Arc::new(Recorder::default());
    let clock = VirtualClock::builder()
        .mode(AdvanceMode::Jump)
        .passthrough(recorder.clone())
        .build();
    let latch = CompletionLatch::new();
    {
        let clock = clock.clone();
        let latch = latch.clone();
        thread::spawn(move || {
            clock.sleep(Duration::from_secs(1)).unwrap();
            latch.signal();
        });
    }
    wait_for_pending(&clock, 1);
    clock.advance(Duration::from_secs(1));

    latch.assert_signaled_within(TIMEOUT);
    assert!(recorder.calls.lock().is_empty());
}

#[test]
fn custom_threshold_moves_the_cutoff() {
    let recorder = Arc::new(Recorder::default());
    let clock = VirtualClock::builder()
        .passthrough_threshold(Duration::from_secs(5))
        .passthrough(recorder.clone())
        .build();

    assert_eq!(
        clock.sleep(Duration::from_secs(4)).unwrap(),
        Wakeup::Passthrough
    );
    assert_eq!(*recorder.calls.lock(), vec![Duration::from_secs(4)]);
}

#[test]
fn unrelated_advances_do_not_release_early() {
    let clock = VirtualClock::jump();
    let (tx, rx) = mpsc::channel();
    let handle = sleep_then_report(&clock, 10.0, tx);
    wait_for_pending(&clock, 1);

    for _ in 0..10 {
        clock.advance(Duration::from_millis(999));
        assert_nothing_woke(&rx);
    }
    clock.advance(Duration::from_millis(9));
    assert_nothing_woke(&rx);
    clock.advance(Duration::from_millis(1));
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap().0, 10.0);
    handle.join().unwrap();
}

#[test]
fn unblock_all_releases_everyone_and_fails_later_sleeps() {
    let clock = VirtualClock::new();
    let (tx, rx) = mpsc::channel();
    let handles: Vec<_> = [2.0, 50.0, 3600.0]
        .into_iter()
        .map(|secs| sleep_then_report(&clock, secs, tx.clone()))
        .collect();
    wait_for_pending(&clock, 3);

    assert_eq!(clock.unblock_all(), 3);
    for _ in 0..3 {
        let (_, wakeup) = rx.recv_timeout(TIMEOUT).unwrap();
        assert!(matches!(wakeup, Wakeup::Released { at, .. } if at == Duration::ZERO));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let late = {
        let clock = clock.clone();
        thread::spawn(move || clock.sleep(Duration::from_secs(1)))
    };
    assert!(matches!(
        late.join().unwrap(),
        Err(ClockError::SleepAfterUnblock { .. })
    ));
    assert_eq!(clock.unblock_all(), 0);
}

#[test]
fn periodic_worker_observes_every_tick_when_stepping() {
    let clock = VirtualClock::builder()
        .mode(AdvanceMode::Stepped {
            increment: Duration::from_millis(100),
            pause: Duration::from_millis(5),
        })
        .build();
    let (tx, rx) = mpsc::channel();
    let worker = {
        let clock = clock.clone();
        thread::spawn(move || {
            for _ in 0..5 {
                match clock.sleep(Duration::from_secs(1)).unwrap() {
                    Wakeup::Reached { at, .. } => tx.send(at).unwrap(),
                    _ => break,
                }
            }
        })
    };
    wait_for_pending(&clock, 1);

    assert_eq!(clock.advance(Duration::from_secs(5)), 5);
    let ticks: Vec<Duration> = rx.iter().take(5).collect();
    for (tick, at) in ticks.iter().enumerate() {
        let expected = Duration::from_secs(tick as u64 + 1);
        assert!(at.abs_diff(expected) <= clock.tolerance(), "tick {tick} at {at:?}");
    }
    worker.join().unwrap();
}

#[test]
fn periodic_worker_collapses_ticks_when_jumping() {
    let clock = VirtualClock::jump();
    let (tx, rx) = mpsc::channel();
    {
        let clock = clock.clone();
        thread::spawn(move || loop {
            match clock.sleep(Duration::from_secs(1)) {
                Ok(Wakeup::Reached { at, .. }) => tx.send(at).unwrap(),
                _ => break,
            }
        });
    }
    wait_for_pending(&clock, 1);

    assert_eq!(clock.advance(Duration::from_secs(5)), 1);
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), Duration::from_secs(5));
    wait_for_pending(&clock, 1);
    assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    clock.unblock_all();
}

#[test]
fn sleep_until_told_survives_elapsed_time() {
    for clock in [VirtualClock::jump(), VirtualClock::new()] {
        clock.advance(Duration::from_secs(1));
        let sleeper = {
            let clock = clock.clone();
            thread::spawn(move || clock.sleep(Duration::MAX))
        };
        wait_for_pending(&clock, 1);

        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.unblock_all(), 1);
        assert!(matches!(
            sleeper.join().unwrap(),
            Ok(Wakeup::Released { target, .. }) if target == Duration::MAX
        ));
    }
}

#[test]
fn huge_jump_releases_everything_and_pins_time() {
    let clock = VirtualClock::jump();
    let (tx, rx) = mpsc::channel();
    let handles: Vec<_> = [1.0, 1e9]
        .into_iter()
        .map(|secs| sleep_then_report(&clock, secs, tx.clone()))
        .collect();
    wait_for_pending(&clock, 2);

    assert_eq!(clock.advance(Duration::MAX), 2);
    clock.assert_current_time(Duration::MAX);
    for _ in 0..2 {
        let (_, wakeup) = rx.recv_timeout(TIMEOUT).unwrap();
        assert!(matches!(wakeup, Wakeup::Reached { at, .. } if at == Duration::MAX));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn latch_accepts_unbounded_timeouts() {
    let latch = CompletionLatch::new();
    latch.signal();
    assert!(latch.wait_within(Duration::MAX));
    latch.assert_signaled_within(Duration::MAX);
    assert_eq!(
        latch.check_not_signaled_within(Duration::MAX),
        Err(LatchError::UnexpectedlySignaled)
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn advances_are_additive(steps in prop::collection::vec(0u64..3_000, 0..8)) {
        let total: u64 = steps.iter().sum();
        for clock in [VirtualClock::jump(), VirtualClock::new()] {
            for ms in &steps {
                clock.advance(Duration::from_millis(*ms));
            }
            prop_assert_eq!(clock.now(), Duration::from_millis(total));
        }
    }

    #[test]
    fn jump_advances_saturate(steps in prop::collection::vec(any::<u64>(), 0..6)) {
        let clock = VirtualClock::jump();
        let mut expected = Duration::ZERO;
        for secs in &steps {
            clock.advance(Duration::from_secs(*secs));
            expected = expected.saturating_add(Duration::from_secs(*secs));
        }
        prop_assert_eq!(clock.now(), expected);
    }

    #[test]
    fn sub_threshold_sleeps_never_register(ms in 0u64..1_000) {
        let recorder = Arc::new(Recorder::default());
        let clock = VirtualClock::builder().passthrough(recorder.clone()).build();
        prop_assert_eq!(clock.sleep(Duration::from_millis(ms)).unwrap(), Wakeup::Passthrough);
        prop_assert_eq!(clock.pending(), 0);
        prop_assert_eq!(recorder.calls.lock().len(), 1);
    }
}
