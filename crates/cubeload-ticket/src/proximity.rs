//! Distance to the nearest observer, up to a fixed range.

use cubeload_core::{Level, Position, NO_SOURCE};
use cubeload_graph::{Connectivity, DistanceGraph, LevelStore};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::observer::{Granularity, ObserverIndex};

/// Positions touched by a processing pass.
pub(crate) type ChangedSet = IndexSet<Position, FxBuildHasher>;

/// Tracks, for every key within `range` of an occupied key, its distance
/// to the nearest one. Keys farther away are not stored.
#[derive(Debug)]
pub struct ProximityTracker {
    range: Level,
    connectivity: Connectivity,
    granularity: Granularity,
    graph: DistanceGraph,
    members: FxHashMap<Position, Level>,
    /// Key -> "every occupancy change since the last pass was an arrival".
    changes: IndexMap<Position, bool, FxBuildHasher>,
}

struct ProximityLevels<'a> {
    connectivity: Connectivity,
    granularity: Granularity,
    range: Level,
    observers: &'a ObserverIndex,
    members: &'a mut FxHashMap<Position, Level>,
    changed: Option<&'a mut ChangedSet>,
}

impl LevelStore for ProximityLevels<'_> {
    fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    fn source_level(&self, pos: Position) -> Level {
        if self.observers.is_occupied(pos, self.granularity) {
            0
        } else {
            NO_SOURCE
        }
    }

    fn level(&self, pos: Position) -> Level {
        self.members.get(&pos).copied().unwrap_or(self.range + 1)
    }

    fn set_level(&mut self, pos: Position, level: Level) {
        let previous = if level > self.range {
            self.members.remove(&pos)
        } else {
            self.members.insert(pos, level)
        };
        if previous != Some(level) {
            if let Some(changed) = self.changed.as_deref_mut() {
                changed.insert(pos);
            }
        }
    }
}

impl ProximityTracker {
    /// Track keys up to `range` away at `granularity`, relaxing over
    /// `connectivity`.
    pub fn new(range: Level, connectivity: Connectivity, granularity: Granularity) -> Self {
        Self {
            range,
            connectivity,
            granularity,
            graph: DistanceGraph::new(range + 2),
            members: FxHashMap::default(),
            changes: IndexMap::default(),
        }
    }

    /// The spawn-radius tracker: columns within 8 over the horizontal ring.
    pub fn spawn(range: Level) -> Self {
        Self::new(range, Connectivity::Column8, Granularity::Column)
    }

    /// Largest stored level.
    pub fn range(&self) -> Level {
        self.range
    }

    /// Key granularity.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Record that the occupancy of `key` changed. Takes effect on the next
    /// [`process_all`](Self::process_all).
    pub fn update_source(&mut self, key: Position, occupied: bool) {
        self.changes
            .entry(key)
            .and_modify(|arrival| *arrival &= occupied)
            .or_insert(occupied);
    }

    /// Apply recorded occupancy changes and drain the graph. Returns the
    /// number of positions processed.
    pub fn process_all(&mut self, observers: &ObserverIndex) -> usize {
        self.process_inner(observers, None)
    }

    pub(crate) fn process_tracking(
        &mut self,
        observers: &ObserverIndex,
        changed: &mut ChangedSet,
    ) -> usize {
        self.process_inner(observers, Some(changed))
    }

    fn process_inner(
        &mut self,
        observers: &ObserverIndex,
        changed: Option<&mut ChangedSet>,
    ) -> usize {
        if self.changes.is_empty() && self.graph.is_settled() {
            return 0;
        }
        let changes = std::mem::take(&mut self.changes);
        let mut view = ProximityLevels {
            connectivity: self.connectivity,
            granularity: self.granularity,
            range: self.range,
            observers,
            members: &mut self.members,
            changed,
        };
        for (key, arrival) in changes {
            let level = view.source_level(key);
            self.graph.update_source_level(&view, key, level, arrival);
        }
        self.graph.drain(&mut view)
    }

    /// `true` if the key of `pos` is within range.
    pub fn within_range(&self, pos: Position) -> bool {
        self.members.contains_key(&self.granularity.key(pos))
    }

    /// Level of the key of `pos`, `range + 1` when out of range.
    pub fn level(&self, pos: Position) -> Level {
        self.members
            .get(&self.granularity.key(pos))
            .copied()
            .unwrap_or(self.range + 1)
    }

    /// Number of keys within range.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` when no key is within range.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Every key within range and its level.
    pub fn members(&self) -> impl Iterator<Item = (Position, Level)> + '_ {
        self.members.iter().map(|(&pos, &level)| (pos, level))
    }

    /// `true` when no change is waiting to be processed.
    pub fn is_settled(&self) -> bool {
        self.changes.is_empty() && self.graph.is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubeload_core::ObserverId;

    fn arrive(t: &mut ProximityTracker, obs: &mut ObserverIndex, id: u64, pos: Position) {
        let left = obs.update(ObserverId(id), pos);
        if let Some(old) = left.filter(|old| *old != pos) {
            let key = t.granularity().key(old);
            t.update_source(key, obs.is_occupied(key, t.granularity()));
        }
        let key = t.granularity().key(pos);
        t.update_source(key, obs.is_occupied(key, t.granularity()));
    }

    #[test]
    fn spawn_radius_is_a_square_of_columns() {
        let mut t = ProximityTracker::spawn(8);
        let mut obs = ObserverIndex::new();
        arrive(&mut t, &mut obs, 1, Position::new(0, 4, 0));
        t.process_all(&obs);

        assert_eq!(t.len(), 17 * 17);
        assert!(t.within_range(Position::new(8, 100, -8)));
        assert!(!t.within_range(Position::new(9, 0, 0)));
        assert_eq!(t.level(Position::new(-5, 0, 3)), 5);
        assert_eq!(t.level(Position::new(20, 0, 0)), 9);
    }

    #[test]
    fn leaving_clears_membership() {
        let mut t = ProximityTracker::new(3, Connectivity::Full26, Granularity::Section);
        let mut obs = ObserverIndex::new();
        arrive(&mut t, &mut obs, 1, Position::new(0, 0, 0));
        t.process_all(&obs);
        assert_eq!(t.len(), 7 * 7 * 7);

        obs.remove(ObserverId(1));
        t.update_source(Position::new(0, 0, 0), false);
        t.process_all(&obs);
        assert!(t.is_empty());
        assert!(t.is_settled());
    }

    #[test]
    fn moving_observer_tracks_new_position() {
        let mut t = ProximityTracker::new(2, Connectivity::Face6, Granularity::Section);
        let mut obs = ObserverIndex::new();
        arrive(&mut t, &mut obs, 1, Position::new(0, 0, 0));
        t.process_all(&obs);
        arrive(&mut t, &mut obs, 1, Position::new(10, 0, 0));
        t.process_all(&obs);

        assert_eq!(t.level(Position::new(10, 0, 0)), 0);
        assert_eq!(t.level(Position::new(11, 1, 0)), 2);
        assert!(!t.within_range(Position::new(0, 0, 0)));
        // Face6 ball of radius 2: 1 + 6 + 18.
        assert_eq!(t.len(), 25);
    }

    #[test]
    fn tracking_reports_changed_keys() {
        let mut t = ProximityTracker::new(1, Connectivity::Column8, Granularity::Column);
        let mut obs = ObserverIndex::new();
        arrive(&mut t, &mut obs, 1, Position::new(0, 0, 0));
        let mut changed = ChangedSet::default();
        t.process_tracking(&obs, &mut changed);
        assert_eq!(changed.len(), 9);

        changed.clear();
        assert_eq!(t.process_tracking(&obs, &mut changed), 0);
        assert!(changed.is_empty());
    }
}
