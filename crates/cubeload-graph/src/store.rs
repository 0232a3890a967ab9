//! The strategy trait concrete trackers implement.

use cubeload_core::{Level, Position};

use crate::connectivity::Connectivity;

/// Storage and side effects behind a [`DistanceGraph`](crate::DistanceGraph).
///
/// The graph itself only tracks which positions are dirty. Current levels
/// live wherever the tracker keeps them (a membership map, an external
/// holder, ...), and `set_level` is the tracker's chance to react.
///
/// Implementations are usually short-lived views borrowing the tracker's
/// state for the duration of one graph call.
pub trait LevelStore {
    /// Neighbourhood used to relax levels.
    fn connectivity(&self) -> Connectivity;

    /// The level demanded by `pos` itself, ignoring neighbours.
    ///
    /// Return [`NO_SOURCE`](cubeload_core::NO_SOURCE) (or anything at or
    /// above the graph's sentinel) when `pos` is not a source.
    fn source_level(&self, pos: Position) -> Level;

    /// The currently recorded level of `pos`.
    fn level(&self, pos: Position) -> Level;

    /// Record a new level for `pos`.
    fn set_level(&mut self, pos: Position, level: Level);
}
