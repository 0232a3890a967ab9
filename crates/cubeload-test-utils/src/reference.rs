//! Brute-force level solver and a map-backed store.
//!
//! - [`reference_levels`]: multi-source breadth-first search, the ground
//!   truth a settled `DistanceGraph` must match.
//! - [`MapLevelStore`]: a [`LevelStore`] over two hash maps, for driving a
//!   graph directly.

use cubeload_core::{Level, Position, NO_SOURCE};
use cubeload_graph::{Connectivity, LevelStore};
use rustc_hash::FxHashMap;

/// Every position whose settled level is below `level_count - 1`, computed
/// by a bucketed breadth-first search from `sources`.
///
/// Source levels at or above the sentinel are ignored.
pub fn reference_levels(
    sources: &FxHashMap<Position, Level>,
    connectivity: Connectivity,
    level_count: Level,
) -> FxHashMap<Position, Level> {
    let sentinel = level_count - 1;
    let mut buckets: Vec<Vec<Position>> = vec![Vec::new(); sentinel as usize];
    for (&pos, &level) in sources {
        if level < sentinel {
            buckets[level as usize].push(pos);
        }
    }

    let mut settled = FxHashMap::default();
    for level in 0..sentinel {
        let frontier = std::mem::take(&mut buckets[level as usize]);
        for pos in frontier {
            if settled.contains_key(&pos) {
                continue;
            }
            settled.insert(pos, level);
            let next = level + 1;
            if next < sentinel {
                for n in connectivity.neighbours(pos) {
                    if !settled.contains_key(&n) {
                        buckets[next as usize].push(n);
                    }
                }
            }
        }
    }
    settled
}

/// Levels and sources held in plain maps. Absent entries read as the
/// sentinel and [`NO_SOURCE`] respectively.
#[derive(Debug)]
pub struct MapLevelStore {
    connectivity: Connectivity,
    sentinel: Level,
    pub sources: FxHashMap<Position, Level>,
    pub levels: FxHashMap<Position, Level>,
}

impl MapLevelStore {
    pub fn new(connectivity: Connectivity, level_count: Level) -> Self {
        Self {
            connectivity,
            sentinel: level_count - 1,
            sources: FxHashMap::default(),
            levels: FxHashMap::default(),
        }
    }
}

impl LevelStore for MapLevelStore {
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
        if level >= self.sentinel {
            self.levels.remove(&pos);
        } else {
            self.levels.insert(pos, level);
        }
    }
}
