//! Concurrency caps hold under a real thread pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cubeload_core::Position;
use cubeload_sched::{Lane, Runner, Scheduler, SchedulerConfig};
use cubeload_test_utils::ConcurrencyProbe;
use proptest::prelude::*;

fn run_to_idle<A: Send + 'static>(sched: &mut Scheduler<A>) {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        sched.pump();
        if sched.is_idle() {
            return;
        }
        assert!(Instant::now() < deadline, "scheduler did not drain: {}", sched.summary());
        for done in sched.wait_completed(Duration::from_millis(100)) {
            assert!(sched.complete(done.key));
        }
    }
}

#[test]
fn thousand_loads_never_exceed_cap() {
    let probe = Arc::new(ConcurrencyProbe::new(Duration::from_micros(50)));
    let recorder = Arc::clone(&probe);
    let runner: Runner<Position> = Arc::new(move |key: &Position| recorder.record(*key));
    let config = SchedulerConfig {
        max_concurrent_loads: 4,
        worker_count: Some(8),
        ..SchedulerConfig::default()
    };
    let mut sched = Scheduler::new(&config, runner).unwrap();

    for i in 0..1000 {
        let key = Position::new(i % 10, i / 100, (i / 10) % 10);
        sched.enqueue(Lane::Load, key, (i % 7) as u32, key);
    }
    run_to_idle(&mut sched);

    assert!(probe.peak() <= 4, "peak concurrency {}", probe.peak());
    assert!(probe.peak() >= 1);
    assert_eq!(probe.total_runs(), 1000);
    assert_eq!(probe.distinct_keys(), 1000);
    assert_eq!(probe.runs_of(Position::new(3, 5, 7)), 1);
    assert_eq!(sched.stats().dispatched, 1000);
    sched.shutdown();
}

#[test]
fn unload_lane_has_its_own_cap() {
    let probe = Arc::new(ConcurrencyProbe::new(Duration::from_micros(50)));
    let recorder = Arc::clone(&probe);
    let runner: Runner<Position> = Arc::new(move |key: &Position| recorder.record(*key));
    let config = SchedulerConfig {
        max_concurrent_loads: 1,
        max_concurrent_unloads: 3,
        worker_count: Some(6),
        ..SchedulerConfig::default()
    };
    let mut sched = Scheduler::new(&config, runner).unwrap();
    for i in 0..200 {
        let key = Position::new(i, 0, 0);
        let lane = if i % 2 == 0 { Lane::Load } else { Lane::Unload };
        sched.enqueue(lane, key, 0, key);
    }
    run_to_idle(&mut sched);
    assert!(probe.peak() <= 4, "peak concurrency {}", probe.peak());
    assert_eq!(probe.total_runs(), 200);
    assert!((0..200).all(|i| probe.runs_of(Position::new(i, 0, 0)) == 1));
}

#[derive(Clone, Debug)]
enum Op {
    Load(i32),
    Unload(i32),
    Cancel(i32),
    Pump,
    CompleteOne,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6i32).prop_map(Op::Load),
        (0..6i32).prop_map(Op::Unload),
        (0..6i32).prop_map(Op::Cancel),
        Just(Op::Pump),
        Just(Op::CompleteOne),
    ]
}

proptest! {
    /// Whatever the interleaving, a key is never dispatched while it is
    /// still in flight, and the caps are never exceeded.
    #[test]
    fn single_flight_under_random_ops(ops in prop::collection::vec(op(), 1..80)) {
        let runner: Runner<Position> = Arc::new(|_: &Position| {});
        let config = SchedulerConfig {
            max_concurrent_loads: 2,
            max_concurrent_unloads: 2,
            worker_count: Some(0),
            ..SchedulerConfig::default()
        };
        let mut sched = Scheduler::new(&config, runner).unwrap();
        let mut in_flight: Vec<Position> = Vec::new();

        for op in ops {
            match op {
                Op::Load(x) => {
                    let key = Position::new(x, 0, 0);
                    sched.enqueue(Lane::Load, key, 0, key);
                }
                Op::Unload(x) => {
                    let key = Position::new(x, 0, 0);
                    sched.enqueue(Lane::Unload, key, 0, key);
                }
                Op::Cancel(x) => {
                    sched.cancel(Position::new(x, 0, 0));
                }
                Op::Pump => {
                    sched.pump();
                    for done in sched.drain_completed() {
                        let key = done.key;
                        prop_assert!(!in_flight.contains(&key), "{} dispatched twice", key);
                        in_flight.push(done.key);
                    }
                }
                Op::CompleteOne => {
                    if let Some(key) = in_flight.pop() {
                        prop_assert!(sched.complete(key));
                    }
                }
            }
            prop_assert!(sched.queue().in_flight_len(Lane::Load) <= 2);
            prop_assert!(sched.queue().in_flight_len(Lane::Unload) <= 2);
            prop_assert_eq!(
                sched.queue().in_flight_len(Lane::Load) + sched.queue().in_flight_len(Lane::Unload),
                in_flight.len()
            );
        }
    }
}
