//! The incremental level-propagation engine.
//!
//! # Algorithm
//!
//! Every dirty position carries a *pending* target level and sits in the
//! bucket `min(current, target)`. Buckets are drained lowest first:
//!
//! - **Decrease** (`target < current`): the new level is final. It is
//!   stored and neighbours are offered `target + 1`.
//! - **Increase** (`target > current`): the old level may have been
//!   supporting neighbours. The position is parked at the sentinel and
//!   re-queued at its target, and every neighbour whose level was exactly
//!   `current + 1` is re-derived from its remaining neighbours.
//!
//! Draining lowest bucket first means a position is never finalised before
//! everything that could lower it, so the total work is proportional to the
//! number of positions whose level actually changes.

use cubeload_core::{Level, Position};
use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::store::LevelStore;

type Bucket = IndexSet<Position, FxBuildHasher>;

/// Sparse multi-source level propagation with a bounded drain.
///
/// Levels range over `0..level_count`; `level_count - 1` is the sentinel
/// meaning "no demand". The graph owns only its worklist: current levels
/// are read and written through the [`LevelStore`] passed to each call.
#[derive(Debug)]
pub struct DistanceGraph {
    level_count: Level,
    buckets: Vec<Bucket>,
    pending: FxHashMap<Position, Level>,
    /// Lowest non-empty bucket, or `level_count` when settled.
    min_pending: Level,
}

impl DistanceGraph {
    /// Create an empty graph over `level_count` levels.
    ///
    /// # Panics
    ///
    /// Panics if `level_count < 2`: one level is always reserved for the
    /// sentinel.
    pub fn new(level_count: Level) -> Self {
        assert!(
            level_count >= 2,
            "DistanceGraph needs at least one level besides the sentinel"
        );
        Self {
            level_count,
            buckets: (0..level_count).map(|_| Bucket::default()).collect(),
            pending: FxHashMap::default(),
            min_pending: level_count,
        }
    }

    /// Number of levels, sentinel included.
    pub fn level_count(&self) -> Level {
        self.level_count
    }

    /// The "no demand" level.
    pub fn sentinel(&self) -> Level {
        self.level_count - 1
    }

    /// `true` when no position is waiting to be processed.
    pub fn is_settled(&self) -> bool {
        self.min_pending >= self.level_count
    }

    /// Number of positions waiting to be processed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Record that the source level of `pos` changed to `level`.
    ///
    /// `is_decrease` must only be `true` when the source level did not go
    /// up since the last drain; it selects the cheap relaxation path.
    /// Nothing is propagated until [`process_updates`](Self::process_updates).
    pub fn update_source_level<S: LevelStore + ?Sized>(
        &mut self,
        store: &S,
        pos: Position,
        level: Level,
        is_decrease: bool,
    ) {
        let current = store.level(pos);
        let pending = self.pending.get(&pos).copied();
        self.update_level(store, None, pos, level, current, pending, is_decrease);
    }

    /// Process up to `budget` queued positions in ascending bucket order.
    ///
    /// Returns the unused budget. A return value equal to `budget` means
    /// the graph was already settled; a return value of zero means the
    /// budget ran out and more work may be pending.
    pub fn process_updates<S: LevelStore + ?Sized>(
        &mut self,
        store: &mut S,
        budget: usize,
    ) -> usize {
        let max = self.sentinel();
        let mut remaining = budget;
        while self.min_pending < self.level_count && remaining > 0 {
            remaining -= 1;
            let bucket = self.min_pending as usize;
            let pos = self.buckets[bucket]
                .pop()
                .expect("bucket at min_pending is never empty");
            if self.buckets[bucket].is_empty() {
                self.advance_min_pending(self.level_count);
            }
            let current = store.level(pos).min(max);
            let target = self
                .pending
                .remove(&pos)
                .expect("queued position has a pending level");

            if target < current {
                store.set_level(pos, target);
                self.propagate_from(&*store, pos, target, true);
            } else if target > current {
                self.enqueue(pos, target, self.bucket_of(max, target));
                store.set_level(pos, max);
                self.propagate_from(&*store, pos, current, false);
            }
        }
        remaining
    }

    /// Drain until settled. Returns the number of positions processed.
    pub fn drain<S: LevelStore + ?Sized>(&mut self, store: &mut S) -> usize {
        usize::MAX - self.process_updates(store, usize::MAX)
    }

    fn propagate_from<S: LevelStore + ?Sized>(
        &mut self,
        store: &S,
        pos: Position,
        level: Level,
        decrease: bool,
    ) {
        for neighbour in store.connectivity().neighbours(pos) {
            self.propagate_to(store, pos, neighbour, level, decrease);
        }
    }

    /// Offer `to` the level `level + 1` coming from `from`.
    fn propagate_to<S: LevelStore + ?Sized>(
        &mut self,
        store: &S,
        from: Position,
        to: Position,
        level: Level,
        decrease: bool,
    ) {
        let max = self.sentinel();
        let pending = self.pending.get(&to).copied();
        let offered = level.saturating_add(1).min(max);
        if decrease {
            let current = store.level(to);
            self.update_level(store, Some(from), to, offered, current, pending, true);
            return;
        }

        // Only neighbours whose level could have come from `from` need
        // re-deriving.
        let derived = match pending {
            Some(target) => target,
            None => store.level(to).min(max),
        };
        if offered == derived {
            let current = match pending {
                Some(_) => store.level(to),
                None => derived,
            };
            self.update_level(store, Some(from), to, max, current, pending, false);
        }
    }

    /// Requeue `pos` for its new target level.
    ///
    /// `from` is the neighbour that triggered the update, or `None` when the
    /// update comes from the position's own source.
    #[allow(clippy::too_many_arguments)]
    fn update_level<S: LevelStore + ?Sized>(
        &mut self,
        store: &S,
        from: Option<Position>,
        pos: Position,
        level: Level,
        current: Level,
        pending: Option<Level>,
        decrease: bool,
    ) {
        let max = self.sentinel();
        let level = level.min(max);
        let current = current.min(max);
        let queued = pending.unwrap_or(current);
        let target = if decrease {
            queued.min(level)
        } else {
            self.recompute(store, pos, from, level).min(max)
        };
        let queued_bucket = self.bucket_of(current, queued);

        if current != target {
            let bucket = self.bucket_of(current, target);
            if pending.is_some() && queued_bucket != bucket {
                self.remove_from_bucket(pos, queued_bucket, bucket);
            }
            self.enqueue(pos, target, bucket);
        } else if pending.is_some() {
            self.pending.remove(&pos);
            self.remove_from_bucket(pos, queued_bucket, self.level_count);
        }
    }

    /// Lowest level `pos` can take from its source and neighbours, never
    /// above `ceiling`. `excluded` is left out of the minimum; `None`
    /// excludes the position's own source (the caller already folded it
    /// into `ceiling`).
    fn recompute<S: LevelStore + ?Sized>(
        &self,
        store: &S,
        pos: Position,
        excluded: Option<Position>,
        ceiling: Level,
    ) -> Level {
        let mut best = ceiling;
        if excluded.is_some() {
            best = best.min(store.source_level(pos));
        }
        for neighbour in store.connectivity().neighbours(pos) {
            if best == 0 {
                return 0;
            }
            if Some(neighbour) == excluded {
                continue;
            }
            best = best.min(store.level(neighbour).saturating_add(1));
        }
        best
    }

    fn bucket_of(&self, a: Level, b: Level) -> Level {
        a.min(b).min(self.sentinel())
    }

    fn enqueue(&mut self, pos: Position, target: Level, bucket: Level) {
        self.pending.insert(pos, target);
        self.buckets[bucket as usize].insert(pos);
        if self.min_pending > bucket {
            self.min_pending = bucket;
        }
    }

    /// Take `pos` out of `bucket`. If that empties the lowest bucket, the
    /// next non-empty one below `search_limit` becomes the lowest.
    fn remove_from_bucket(&mut self, pos: Position, bucket: Level, search_limit: Level) {
        let set = &mut self.buckets[bucket as usize];
        set.swap_remove(&pos);
        if set.is_empty() && self.min_pending == bucket {
            self.advance_min_pending(search_limit);
        }
    }

    fn advance_min_pending(&mut self, limit: Level) {
        let start = self.min_pending + 1;
        self.min_pending = limit;
        for level in start..limit {
            if !self.buckets[level as usize].is_empty() {
                self.min_pending = level;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Connectivity;
    use cubeload_core::NO_SOURCE;

    /// Levels and sources in plain maps; absent means sentinel / no source.
    struct MapStore {
        connectivity: Connectivity,
        sentinel: Level,
        sources: FxHashMap<Position, Level>,
        levels: FxHashMap<Position, Level>,
        writes: usize,
    }

    impl MapStore {
        fn new(connectivity: Connectivity, level_count: Level) -> Self {
            Self {
                connectivity,
                sentinel: level_count - 1,
                sources: FxHashMap::default(),
                levels: FxHashMap::default(),
                writes: 0,
            }
        }
    }

    impl LevelStore for MapStore {
        fn connectivity(&self) -> Connectivity {
            self.connectivity
        }

        fn source_level(&self, pos: Position) -> Level {
            self.sources.get(&pos).copied().unwrap_or(NO_SOURCE)
        }

        fn level(&self, pos: Position) -> Level {
            self.levels.get(&pos).copied().unwrap_or(self.sentinel)
        }

        fn set_level(&mut self, pos: Position, level: Level) {
            self.writes += 1;
            if level >= self.sentinel {
                self.levels.remove(&pos);
            } else {
                self.levels.insert(pos, level);
            }
        }
    }

    fn set_source(g: &mut DistanceGraph, s: &mut MapStore, pos: Position, level: Level) {
        s.sources.insert(pos, level);
        g.update_source_level(&*s, pos, level, true);
    }

    fn clear_source(g: &mut DistanceGraph, s: &mut MapStore, pos: Position) {
        s.sources.remove(&pos);
        g.update_source_level(&*s, pos, NO_SOURCE, false);
    }

    #[test]
    #[should_panic(expected = "sentinel")]
    fn rejects_single_level() {
        let _ = DistanceGraph::new(1);
    }

    #[test]
    fn new_graph_is_settled() {
        let mut g = DistanceGraph::new(8);
        let mut s = MapStore::new(Connectivity::Full26, 8);
        assert!(g.is_settled());
        assert_eq!(g.process_updates(&mut s, 10), 10);
    }

    #[test]
    fn single_source_spreads_by_chebyshev_distance() {
        let mut g = DistanceGraph::new(6);
        let mut s = MapStore::new(Connectivity::Full26, 6);
        let origin = Position::new(0, 0, 0);
        set_source(&mut g, &mut s, origin, 1);
        g.drain(&mut s);

        assert_eq!(s.level(origin), 1);
        assert_eq!(s.level(Position::new(1, 1, 1)), 2);
        assert_eq!(s.level(Position::new(-3, 2, 0)), 4);
        assert_eq!(s.level(Position::new(4, 0, 0)), 5);
        // Radius 3 cube around the origin holds every level below the sentinel.
        assert_eq!(s.levels.len(), 7 * 7 * 7);
    }

    #[test]
    fn removing_the_only_source_clears_everything() {
        let mut g = DistanceGraph::new(5);
        let mut s = MapStore::new(Connectivity::Face6, 5);
        let p = Position::new(10, -3, 4);
        set_source(&mut g, &mut s, p, 0);
        g.drain(&mut s);
        assert!(!s.levels.is_empty());

        clear_source(&mut g, &mut s, p);
        g.drain(&mut s);
        assert!(s.levels.is_empty(), "left behind: {:?}", s.levels);
        assert!(g.is_settled());
    }

    #[test]
    fn two_sources_take_the_minimum() {
        let mut g = DistanceGraph::new(10);
        let mut s = MapStore::new(Connectivity::Column8, 10);
        let a = Position::new(0, 0, 0);
        let b = Position::new(6, 0, 0);
        set_source(&mut g, &mut s, a, 0);
        set_source(&mut g, &mut s, b, 2);
        g.drain(&mut s);

        assert_eq!(s.level(Position::new(3, 0, 0)), 3);
        assert_eq!(s.level(Position::new(5, 0, 0)), 3);
        assert_eq!(s.level(Position::new(8, 0, 0)), 4);

        clear_source(&mut g, &mut s, a);
        g.drain(&mut s);
        assert_eq!(s.level(a), 8);
        assert_eq!(s.level(Position::new(3, 0, 0)), 5);
    }

    #[test]
    fn raising_a_source_shrinks_its_reach() {
        let mut g = DistanceGraph::new(6);
        let mut s = MapStore::new(Connectivity::Face6, 6);
        let p = Position::new(0, 0, 0);
        set_source(&mut g, &mut s, p, 0);
        g.drain(&mut s);
        assert_eq!(s.level(Position::new(0, 0, 4)), 4);

        s.sources.insert(p, 3);
        g.update_source_level(&s, p, 3, false);
        g.drain(&mut s);
        assert_eq!(s.level(p), 3);
        assert_eq!(s.level(Position::new(0, 0, 2)), 5);
        assert_eq!(s.level(Position::new(0, 0, 3)), 5);
    }

    #[test]
    fn direct_only_never_spreads() {
        let mut g = DistanceGraph::new(4);
        let mut s = MapStore::new(Connectivity::DirectOnly, 4);
        let p = Position::new(1, 1, 1);
        set_source(&mut g, &mut s, p, 0);
        g.drain(&mut s);
        assert_eq!(s.levels.len(), 1);
        assert_eq!(s.level(p), 0);
    }

    #[test]
    fn budget_bounds_each_call() {
        let mut g = DistanceGraph::new(8);
        let mut s = MapStore::new(Connectivity::Full26, 8);
        set_source(&mut g, &mut s, Position::new(0, 0, 0), 0);

        assert_eq!(g.process_updates(&mut s, 5), 0);
        assert!(!g.is_settled());
        assert_eq!(s.writes, 5);

        let consumed = g.drain(&mut s);
        assert!(consumed > 0);
        assert!(g.is_settled());
        assert_eq!(s.level(Position::new(6, 6, 6)), 6);
    }

    #[test]
    fn source_toggled_before_drain_is_a_no_op() {
        let mut g = DistanceGraph::new(6);
        let mut s = MapStore::new(Connectivity::Full26, 6);
        let p = Position::new(2, 2, 2);
        set_source(&mut g, &mut s, p, 0);
        clear_source(&mut g, &mut s, p);
        assert!(g.is_settled());
        g.drain(&mut s);
        assert!(s.levels.is_empty());
        assert_eq!(s.writes, 0);
    }

    #[test]
    fn moving_a_source_follows_it() {
        let mut g = DistanceGraph::new(7);
        let mut s = MapStore::new(Connectivity::Column8, 7);
        let mut at = Position::new(0, 0, 0);
        set_source(&mut g, &mut s, at, 0);
        g.drain(&mut s);
        for step in 1..=10 {
            let next = Position::new(step, 0, 0);
            set_source(&mut g, &mut s, next, 0);
            clear_source(&mut g, &mut s, at);
            g.drain(&mut s);
            at = next;
        }
        assert_eq!(s.level(Position::new(10, 0, 0)), 0);
        assert_eq!(s.level(Position::new(4, 0, 0)), 6);
        assert_eq!(s.level(Position::new(0, 0, 0)), 6);
        assert_eq!(s.levels.len(), 11 * 11);
    }
}
