//! Test utilities and mock types for cubeload development.
//!
//! Provides a mock [`HolderProvider`] backed by plain maps, a
//! [`MapLevelStore`] for driving a bare graph, a breadth-first
//! [`reference_levels`] solver to check settled graphs against, and a
//! [`ConcurrencyProbe`] for runners that must respect a concurrency cap.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod probe;
pub mod reference;

pub use probe::ConcurrencyProbe;
pub use reference::{reference_levels, MapLevelStore};

use cubeload_core::{Level, Position, UNLOADED_LEVEL};
use cubeload_ticket::HolderProvider;
use rustc_hash::{FxHashMap, FxHashSet};

/// Mock implementation of [`HolderProvider`].
///
/// A holder is just its position. `set_level` creates the holder on the way
/// in, revives it if it was unloading, and drops it once the level reaches
/// [`UNLOADED_LEVEL`]. Every call is logged for assertions.
#[derive(Debug, Default)]
pub struct MockHolderProvider {
    levels: FxHashMap<Position, Level>,
    unloading: FxHashSet<Position>,
    not_ready: FxHashSet<Position>,
    touched: FxHashSet<Position>,
    finalized: Vec<Position>,
    set_level_calls: usize,
}

impl MockHolderProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `pos` as being torn down; the activation graph then treats it
    /// as unloaded.
    pub fn set_unloading(&mut self, pos: Position, unloading: bool) {
        if unloading {
            self.unloading.insert(pos);
        } else {
            self.unloading.remove(&pos);
        }
    }

    /// Holders are ready by default. A not-ready holder keeps its view
    /// slot occupied.
    pub fn set_ready(&mut self, pos: Position, ready: bool) {
        if ready {
            self.not_ready.remove(&pos);
        } else {
            self.not_ready.insert(pos);
        }
    }

    /// Current holder level, if a holder exists.
    pub fn level_of(&self, pos: Position) -> Option<Level> {
        self.levels.get(&pos).copied()
    }

    /// Every live holder and its level.
    pub fn levels(&self) -> &FxHashMap<Position, Level> {
        &self.levels
    }

    /// Number of live holders.
    pub fn holder_count(&self) -> usize {
        self.levels.len()
    }

    /// `true` if `set_level` was ever called for `pos`.
    pub fn was_touched(&self, pos: Position) -> bool {
        self.touched.contains(&pos)
    }

    /// Holders passed to `finalize`, in call order.
    pub fn finalized(&self) -> &[Position] {
        &self.finalized
    }

    /// Total number of `set_level` calls.
    pub fn set_level_calls(&self) -> usize {
        self.set_level_calls
    }
}

impl HolderProvider for MockHolderProvider {
    type Holder = Position;

    fn is_unloading(&self, pos: Position) -> bool {
        self.unloading.contains(&pos)
    }

    fn holder(&self, pos: Position) -> Option<Position> {
        self.levels.contains_key(&pos).then_some(pos)
    }

    fn holder_level(&self, holder: &Position) -> Level {
        self.levels.get(holder).copied().unwrap_or(UNLOADED_LEVEL)
    }

    fn set_level(
        &mut self,
        pos: Position,
        level: Level,
        holder: Option<Position>,
        _old_level: Level,
    ) -> Option<Position> {
        self.set_level_calls += 1;
        self.touched.insert(pos);
        if level >= UNLOADED_LEVEL {
            self.levels.remove(&pos);
            return holder;
        }
        self.unloading.remove(&pos);
        self.levels.insert(pos, level);
        Some(pos)
    }

    fn finalize(&mut self, holder: &Position) {
        self.finalized.push(*holder);
    }

    fn is_ready(&self, holder: &Position) -> bool {
        !self.not_ready.contains(holder)
    }
}
