//! Neighbourhood policies.
//!
//! Each tracker propagates over its own neighbourhood: sections relax over
//! the full 26-neighbourhood, column-keyed trackers over the horizontal
//! 8-neighbourhood. `DirectOnly` disables propagation entirely, leaving
//! every position at its own source level.

use cubeload_core::Position;
use smallvec::SmallVec;

/// Neighbour list. Inline capacity covers the largest neighbourhood.
pub type Neighbours = SmallVec<[Position; 26]>;

/// All 6 face offsets.
const FACE_6: [(i32, i32, i32); 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

/// All 8 horizontal offsets: cardinal + diagonal, y fixed.
const COLUMN_8: [(i32, i32, i32); 8] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, 0, -1),
    (0, 0, 1),
    (-1, 0, -1),
    (-1, 0, 1),
    (1, 0, -1),
    (1, 0, 1),
];

/// Neighbourhood used by a [`LevelStore`](crate::LevelStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// No neighbours; levels equal source levels.
    DirectOnly,
    /// Face-adjacent sections (6 neighbours).
    Face6,
    /// Horizontal ring around a column (8 neighbours, y unchanged).
    Column8,
    /// Every section of the surrounding 3×3×3 cube (26 neighbours).
    Full26,
}

impl Connectivity {
    /// Number of neighbours of every position.
    pub fn degree(self) -> usize {
        match self {
            Self::DirectOnly => 0,
            Self::Face6 => 6,
            Self::Column8 => 8,
            Self::Full26 => 26,
        }
    }

    /// Enumerate the neighbours of `pos` in a deterministic order.
    ///
    /// Never includes `pos` itself.
    pub fn neighbours(self, pos: Position) -> Neighbours {
        let mut out = Neighbours::new();
        match self {
            Self::DirectOnly => {}
            Self::Face6 => out.extend(FACE_6.iter().map(|&(dx, dy, dz)| pos.offset(dx, dy, dz))),
            Self::Column8 => {
                out.extend(COLUMN_8.iter().map(|&(dx, dy, dz)| pos.offset(dx, dy, dz)))
            }
            Self::Full26 => {
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            if (dx, dy, dz) != (0, 0, 0) {
                                out.push(pos.offset(dx, dy, dz));
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Graph distance between two positions under this neighbourhood, or
    /// `None` if `b` is unreachable from `a`.
    pub fn distance(self, a: Position, b: Position) -> Option<u32> {
        let dx = a.x().abs_diff(b.x());
        let dy = a.y().abs_diff(b.y());
        let dz = a.z().abs_diff(b.z());
        match self {
            Self::DirectOnly => (a == b).then_some(0),
            Self::Face6 => Some(dx + dy + dz),
            Self::Column8 => (dy == 0).then_some(dx.max(dz)),
            Self::Full26 => Some(dx.max(dy).max(dz)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    const ALL: [Connectivity; 4] = [
        Connectivity::DirectOnly,
        Connectivity::Face6,
        Connectivity::Column8,
        Connectivity::Full26,
    ];

    #[test]
    fn degree_matches_enumeration() {
        let p = Position::new(3, -2, 9);
        for c in ALL {
            assert_eq!(c.neighbours(p).len(), c.degree(), "{c:?}");
        }
    }

    #[test]
    fn neighbours_are_distinct_and_exclude_self() {
        let p = Position::new(0, 0, 0);
        for c in ALL {
            let ns = c.neighbours(p);
            let set: FxHashSet<_> = ns.iter().copied().collect();
            assert_eq!(set.len(), ns.len(), "{c:?} yielded duplicates");
            assert!(!set.contains(&p), "{c:?} yielded self");
        }
    }

    #[test]
    fn neighbours_are_at_distance_one() {
        let p = Position::new(-4, 5, 1);
        for c in ALL {
            for n in c.neighbours(p) {
                assert_eq!(c.distance(p, n), Some(1), "{c:?} {n:?}");
            }
        }
    }

    #[test]
    fn neighbourhood_is_symmetric() {
        let p = Position::new(2, 2, 2);
        for c in ALL {
            for n in c.neighbours(p) {
                assert!(c.neighbours(n).contains(&p), "{c:?}");
            }
        }
    }

    #[test]
    fn column8_stays_in_layer() {
        let p = Position::new(0, 7, 0);
        assert!(Connectivity::Column8
            .neighbours(p)
            .iter()
            .all(|n| n.y() == 7));
        assert_eq!(
            Connectivity::Column8.distance(p, Position::new(0, 8, 0)),
            None
        );
    }
}
