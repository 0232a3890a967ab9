//! Two-lane priority queue with single-flight keys.
//!
//! Each lane is a bucket queue indexed by priority (lower runs first, FIFO
//! within a bucket) with its own concurrency cap. A key owns at most one
//! slot across both lanes:
//!
//! - **queued**: waiting in a bucket; a newer `enqueue` replaces it.
//! - **in flight**: dispatched by [`TaskQueue::poll`] and not yet
//!   [`complete`](TaskQueue::complete)d. New work for the key parks in a
//!   single deferred slot and is queued when the key completes.
//!
//! Buckets use lazy deletion: replacing or reprioritising an entry leaves a
//! stale `(key, seq)` behind, skipped when it reaches the front. A lane whose
//! stale entries outnumber its live ones is compacted in place, so bucket
//! memory stays proportional to the backlog even while the lane is capped.

use std::collections::VecDeque;
use std::fmt;

use cubeload_core::{Level, Position};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

/// Which concurrency budget an action draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Work that brings something into existence.
    Load,
    /// Work that tears something down.
    Unload,
}

impl Lane {
    fn index(self) -> usize {
        match self {
            Self::Load => 0,
            Self::Unload => 1,
        }
    }

    fn other(self) -> Self {
        match self {
            Self::Load => Self::Unload,
            Self::Unload => Self::Load,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Unload => f.write_str("unload"),
        }
    }
}

/// An action handed out by [`TaskQueue::poll`]. Its key stays in flight
/// until [`TaskQueue::complete`] is called.
#[derive(Debug)]
pub struct Dispatch<A> {
    /// The key the action belongs to.
    pub key: Position,
    /// The lane whose slot the action occupies.
    pub lane: Lane,
    /// Priority the action was dispatched at.
    pub priority: Level,
    /// The action itself.
    pub action: A,
}

/// Cumulative queue counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Actions accepted by `enqueue`.
    pub enqueued: u64,
    /// Queued or deferred actions superseded by a newer one.
    pub replaced: u64,
    /// Actions removed by `cancel`.
    pub cancelled: u64,
    /// Actions handed out by `poll`.
    pub dispatched: u64,
    /// Slots released by `complete`.
    pub completed: u64,
}

#[derive(Debug)]
struct Queued<A> {
    lane: Lane,
    priority: Level,
    seq: u64,
    action: A,
}

#[derive(Debug)]
struct Deferred<A> {
    lane: Lane,
    priority: Level,
    action: A,
}

#[derive(Debug)]
struct LaneState {
    buckets: Vec<VecDeque<(Position, u64)>>,
    cap: usize,
    queued: usize,
    /// Bucket entries no longer backed by a queued action.
    stale: usize,
    in_flight: usize,
}

impl LaneState {
    fn new(priority_levels: Level, cap: usize) -> Self {
        Self {
            buckets: (0..priority_levels).map(|_| VecDeque::new()).collect(),
            cap,
            queued: 0,
            stale: 0,
            in_flight: 0,
        }
    }
}

/// Priority queue of keyed actions with per-lane concurrency caps.
#[derive(Debug)]
pub struct TaskQueue<A> {
    lanes: [LaneState; 2],
    queued: FxHashMap<Position, Queued<A>>,
    deferred: FxHashMap<Position, Deferred<A>>,
    in_flight: FxHashMap<Position, Lane>,
    /// Lane served first by the next `poll`.
    first_lane: Lane,
    next_seq: u64,
    stats: SchedulerStats,
}

impl<A> TaskQueue<A> {
    /// Create a queue with `priority_levels` buckets per lane.
    ///
    /// # Panics
    ///
    /// Panics if `priority_levels` or either cap is zero;
    /// [`SchedulerConfig::validate`](crate::SchedulerConfig::validate)
    /// rejects those first.
    pub fn new(priority_levels: Level, load_cap: usize, unload_cap: usize) -> Self {
        assert!(priority_levels > 0, "TaskQueue needs at least one priority level");
        assert!(load_cap > 0 && unload_cap > 0, "TaskQueue lane caps must be non-zero");
        Self {
            lanes: [
                LaneState::new(priority_levels, load_cap),
                LaneState::new(priority_levels, unload_cap),
            ],
            queued: FxHashMap::default(),
            deferred: FxHashMap::default(),
            in_flight: FxHashMap::default(),
            first_lane: Lane::Load,
            next_seq: 0,
            stats: SchedulerStats::default(),
        }
    }

    fn clamp(&self, priority: Level) -> Level {
        let last = self.lanes[0].buckets.len() as Level - 1;
        priority.min(last)
    }

    /// Queue `action` for `key`, superseding whatever was queued for it in
    /// either lane. Returns the superseded action.
    ///
    /// If `key` is in flight the action waits until it completes.
    pub fn enqueue(&mut self, lane: Lane, key: Position, priority: Level, action: A) -> Option<A> {
        let priority = self.clamp(priority);
        self.stats.enqueued += 1;

        if self.in_flight.contains_key(&key) {
            let previous = self.deferred.insert(
                key,
                Deferred {
                    lane,
                    priority,
                    action,
                },
            );
            if previous.is_some() {
                self.stats.replaced += 1;
            }
            trace!(%key, %lane, priority, "deferred behind in-flight action");
            return previous.map(|d| d.action);
        }

        let previous = self.push(lane, key, priority, action);
        if previous.is_some() {
            self.stats.replaced += 1;
            trace!(%key, %lane, priority, "replaced queued action");
        } else {
            trace!(%key, %lane, priority, "queued");
        }
        previous
    }

    fn push(&mut self, lane: Lane, key: Position, priority: Level, action: A) -> Option<A> {
        let seq = self.next_seq;
        self.next_seq += 1;
        let previous = self.queued.insert(
            key,
            Queued {
                lane,
                priority,
                seq,
                action,
            },
        );
        let state = &mut self.lanes[lane.index()];
        state.buckets[priority as usize].push_back((key, seq));
        state.queued += 1;
        let previous = previous?;
        self.retire(previous.lane);
        Some(previous.action)
    }

    /// One queued entry of `lane` went stale.
    fn retire(&mut self, lane: Lane) {
        let state = &mut self.lanes[lane.index()];
        state.queued -= 1;
        state.stale += 1;
        self.compact(lane);
    }

    /// Drop every stale entry of `lane` once they outnumber the live ones.
    fn compact(&mut self, lane: Lane) {
        let state = &mut self.lanes[lane.index()];
        if state.stale <= state.queued {
            return;
        }
        let queued = &self.queued;
        for bucket in &mut state.buckets {
            bucket.retain(|(key, seq)| {
                matches!(queued.get(key), Some(q) if q.seq == *seq && q.lane == lane)
            });
        }
        trace!(%lane, dropped = state.stale, "compacted buckets");
        state.stale = 0;
    }

    /// Move the queued or deferred action for `key` to a new priority.
    ///
    /// Returns `false` when nothing is waiting for `key`.
    pub fn update_priority(&mut self, key: Position, priority: Level) -> bool {
        let priority = self.clamp(priority);
        if let Some(deferred) = self.deferred.get_mut(&key) {
            deferred.priority = priority;
            return true;
        }
        let Some(entry) = self.queued.get_mut(&key) else {
            return false;
        };
        if entry.priority == priority {
            return true;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        entry.priority = priority;
        entry.seq = seq;
        let lane = entry.lane;
        let state = &mut self.lanes[lane.index()];
        state.buckets[priority as usize].push_back((key, seq));
        state.stale += 1;
        self.compact(lane);
        true
    }

    /// Drop the queued or deferred action for `key`. In-flight work is not
    /// interrupted.
    pub fn cancel(&mut self, key: Position) -> Option<A> {
        let removed = match self.deferred.remove(&key) {
            Some(deferred) => Some(deferred.action),
            None => self.queued.remove(&key).map(|q| {
                self.retire(q.lane);
                q.action
            }),
        };
        if removed.is_some() {
            self.stats.cancelled += 1;
            trace!(%key, "cancelled");
        }
        removed
    }

    /// Hand out every action that fits under the lane caps, lowest priority
    /// first. Lanes take turns one action at a time.
    pub fn poll(&mut self) -> Vec<Dispatch<A>> {
        let mut out = Vec::new();
        let first = self.first_lane;
        loop {
            let mut progressed = false;
            for lane in [first, first.other()] {
                if let Some(dispatch) = self.pop(lane) {
                    out.push(dispatch);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        self.first_lane = first.other();
        out
    }

    fn pop(&mut self, lane: Lane) -> Option<Dispatch<A>> {
        let li = lane.index();
        if self.lanes[li].in_flight >= self.lanes[li].cap || self.lanes[li].queued == 0 {
            return None;
        }
        for priority in 0..self.lanes[li].buckets.len() {
            while let Some((key, seq)) = self.lanes[li].buckets[priority].pop_front() {
                let live = matches!(
                    self.queued.get(&key),
                    Some(q) if q.seq == seq && q.lane == lane
                );
                if !live {
                    self.lanes[li].stale -= 1;
                    continue;
                }
                let Some(entry) = self.queued.remove(&key) else {
                    continue;
                };
                let state = &mut self.lanes[li];
                state.queued -= 1;
                state.in_flight += 1;
                self.in_flight.insert(key, lane);
                self.stats.dispatched += 1;
                return Some(Dispatch {
                    key,
                    lane,
                    priority: entry.priority,
                    action: entry.action,
                });
            }
        }
        None
    }

    /// Release the slot held by `key` and queue its deferred action, if any.
    ///
    /// Returns `false` (and logs) when `key` was not in flight.
    pub fn complete(&mut self, key: Position) -> bool {
        let Some(lane) = self.in_flight.remove(&key) else {
            warn!(%key, "completion for a key that is not in flight");
            return false;
        };
        self.lanes[lane.index()].in_flight -= 1;
        self.stats.completed += 1;
        trace!(%key, %lane, "slot released");
        if let Some(deferred) = self.deferred.remove(&key) {
            self.push(deferred.lane, key, deferred.priority, deferred.action);
        }
        true
    }

    /// `true` if `key` has been dispatched and not completed.
    pub fn is_in_flight(&self, key: Position) -> bool {
        self.in_flight.contains_key(&key)
    }

    /// Lane of the action waiting for `key`, queued or deferred.
    pub fn waiting_lane(&self, key: Position) -> Option<Lane> {
        self.deferred
            .get(&key)
            .map(|d| d.lane)
            .or_else(|| self.queued.get(&key).map(|q| q.lane))
    }

    /// Number of queued actions (deferred ones excluded).
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Number of actions parked behind an in-flight key.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Number of slots of `lane` currently held.
    pub fn in_flight_len(&self, lane: Lane) -> usize {
        self.lanes[lane.index()].in_flight
    }

    /// `true` when nothing is queued, deferred, or in flight.
    pub fn is_idle(&self) -> bool {
        self.queued.is_empty() && self.deferred.is_empty() && self.in_flight.is_empty()
    }

    /// Cumulative counters.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// One-line human-readable state for debug output.
    pub fn summary(&self) -> String {
        let [load, unload] = &self.lanes;
        format!(
            "queued load={} unload={}, in flight load={}/{} unload={}/{}, deferred={}",
            load.queued,
            unload.queued,
            load.in_flight,
            load.cap,
            unload.in_flight,
            unload.cap,
            self.deferred.len()
        )
    }
}
