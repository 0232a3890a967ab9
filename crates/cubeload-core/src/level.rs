//! The shared level scale.
//!
//! Level 0 is a source and the highest priority; larger levels are farther
//! away and less important. Every tracker caps levels at its own maximum and
//! uses `maximum + 1` as the "no demand" sentinel. The constants below are
//! the activation scale used by tickets and holders.

/// A propagated or source level.
pub type Level = u32;

/// Highest level at which a holder is still kept loaded.
pub const MAX_LOADED_LEVEL: Level = 44;

/// Sentinel level of a position with no holder. Also the activation
/// graph's "infinite" level.
pub const UNLOADED_LEVEL: Level = MAX_LOADED_LEVEL + 1;

/// Level of a ticket registered at distance 0.
pub const TICKET_BASE_LEVEL: Level = 33;

/// Level of the tickets the view tracker registers around observers.
pub const PLAYER_TICKET_LEVEL: Level = 31;

/// Level of the synthetic ticket pinning a forced position.
pub const FORCED_TICKET_LEVEL: Level = 31;

/// Source level reported for a position with no source at all. Graphs clamp
/// it to their own sentinel.
pub const NO_SOURCE: Level = Level::MAX;

/// Convert a ticket distance into a level (`TICKET_BASE_LEVEL - distance`).
///
/// Distances beyond the base level saturate at level 0.
pub fn level_from_distance(distance: u32) -> Level {
    TICKET_BASE_LEVEL.saturating_sub(distance)
}
