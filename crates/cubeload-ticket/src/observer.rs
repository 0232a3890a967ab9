//! Which observer is where.

use cubeload_core::{ObserverId, Position};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// The key a tracker reads occupancy at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Whole columns, `(x, 0, z)`.
    Column,
    /// Individual sections.
    Section,
}

impl Granularity {
    /// Project `pos` onto this granularity's key.
    pub fn key(self, pos: Position) -> Position {
        match self {
            Self::Column => pos.column(),
            Self::Section => pos,
        }
    }
}

/// Observer positions, indexed by section and counted per column.
#[derive(Debug, Default)]
pub struct ObserverIndex {
    positions: FxHashMap<ObserverId, Position>,
    sections: FxHashMap<Position, SmallVec<[ObserverId; 2]>>,
    columns: FxHashMap<Position, u32>,
}

impl ObserverIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `id` at section `pos`. Returns the section it left, or `None`
    /// if it was not tracked before. Moving to the same section is a no-op
    /// that returns `Some(pos)`.
    pub fn update(&mut self, id: ObserverId, pos: Position) -> Option<Position> {
        let previous = self.positions.insert(id, pos);
        match previous {
            Some(old) if old == pos => return previous,
            Some(old) => self.detach(id, old),
            None => {}
        }
        self.sections.entry(pos).or_default().push(id);
        *self.columns.entry(pos.column()).or_default() += 1;
        previous
    }

    /// Stop tracking `id`. Returns the section it was in.
    pub fn remove(&mut self, id: ObserverId) -> Option<Position> {
        let old = self.positions.remove(&id)?;
        self.detach(id, old);
        Some(old)
    }

    fn detach(&mut self, id: ObserverId, pos: Position) {
        if let Some(ids) = self.sections.get_mut(&pos) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.sections.remove(&pos);
            }
        }
        let column = pos.column();
        if let Some(count) = self.columns.get_mut(&column) {
            *count -= 1;
            if *count == 0 {
                self.columns.remove(&column);
            }
        }
    }

    /// Section `id` is in.
    pub fn position(&self, id: ObserverId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    /// `true` if at least one observer is at `key`, read at `granularity`.
    /// `key` must already be projected.
    pub fn is_occupied(&self, key: Position, granularity: Granularity) -> bool {
        match granularity {
            Granularity::Column => self.columns.contains_key(&key),
            Granularity::Section => self.sections.contains_key(&key),
        }
    }

    /// Observers in section `pos`.
    pub fn observers_at(&self, pos: Position) -> &[ObserverId] {
        self.sections.get(&pos).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    /// Number of tracked observers.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// `true` when nobody is tracked.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_between_sections_of_one_column() {
        let mut idx = ObserverIndex::new();
        let a = ObserverId(1);
        assert_eq!(idx.update(a, Position::new(0, 0, 0)), None);
        assert_eq!(idx.update(a, Position::new(0, 3, 0)), Some(Position::new(0, 0, 0)));

        assert!(!idx.is_occupied(Position::new(0, 0, 0), Granularity::Section));
        assert!(idx.is_occupied(Position::new(0, 3, 0), Granularity::Section));
        assert!(idx.is_occupied(Position::new(0, 0, 0), Granularity::Column));
    }

    #[test]
    fn column_counts_multiple_observers() {
        let mut idx = ObserverIndex::new();
        idx.update(ObserverId(1), Position::new(2, 0, 2));
        idx.update(ObserverId(2), Position::new(2, 5, 2));
        let column = Position::new(2, 0, 2);
        assert_eq!(idx.remove(ObserverId(1)), Some(Position::new(2, 0, 2)));
        assert!(idx.is_occupied(column, Granularity::Column));
        idx.remove(ObserverId(2));
        assert!(!idx.is_occupied(column, Granularity::Column));
        assert!(idx.is_empty());
    }

    #[test]
    fn same_section_update_is_noop() {
        let mut idx = ObserverIndex::new();
        let p = Position::new(4, 4, 4);
        idx.update(ObserverId(9), p);
        assert_eq!(idx.update(ObserverId(9), p), Some(p));
        assert_eq!(idx.observers_at(p), &[ObserverId(9)]);
        assert!(idx.remove(ObserverId(10)).is_none());
    }

    #[test]
    fn granularity_projects_columns() {
        let p = Position::new(1, 9, -1);
        assert_eq!(Granularity::Column.key(p), Position::new(1, 0, -1));
        assert_eq!(Granularity::Section.key(p), p);
    }
}
