//! Records how many runner calls overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use cubeload_core::Position;
use rustc_hash::FxHashMap;

/// Shared between a test and the runner closure it installs.
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
    runs: Mutex<FxHashMap<Position, usize>>,
    hold: Duration,
}

impl ConcurrencyProbe {
    /// Each recorded call stays "running" for `hold`, widening the window in
    /// which overlapping calls would be observed.
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            ..Self::default()
        }
    }

    /// Call from inside a runner.
    pub fn record(&self, key: Position) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        *self.runs.lock().unwrap().entry(key).or_default() += 1;
        if !self.hold.is_zero() {
            thread::sleep(self.hold);
        }
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Largest number of simultaneous `record` calls seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// How many times `key` was recorded.
    pub fn runs_of(&self, key: Position) -> usize {
        self.runs.lock().unwrap().get(&key).copied().unwrap_or(0)
    }

    /// Total recorded calls.
    pub fn total_runs(&self) -> usize {
        self.runs.lock().unwrap().values().sum()
    }

    /// Number of distinct keys recorded.
    pub fn distinct_keys(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}
