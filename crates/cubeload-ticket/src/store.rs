//! Per-position ticket sets and the source changes they produce.

use cubeload_core::{Level, Position, TickId, NO_SOURCE};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::trace;

use crate::ticket::{Ticket, TicketSet};

type ChangeMap = IndexMap<Position, bool, FxBuildHasher>;

/// Every live ticket, keyed by position, plus the tick clock that expires
/// them.
///
/// Each change to a position's minimum is recorded so the activation graph
/// can pick it up with [`take_source_changes`](Self::take_source_changes).
#[derive(Debug, Default)]
pub struct TicketStore {
    sets: FxHashMap<Position, TicketSet>,
    now: TickId,
    next_seq: u64,
    /// Position -> "every change since the last take was a decrease".
    changes: ChangeMap,
}

fn record(changes: &mut ChangeMap, pos: Position, decrease: bool) {
    changes
        .entry(pos)
        .and_modify(|d| *d &= decrease)
        .or_insert(decrease);
}

impl TicketStore {
    /// An empty store at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `ticket` at `pos`, or refresh an equal one. Either way the
    /// ticket is stamped with the current tick. Returns the position's new
    /// minimum level.
    pub fn register(&mut self, pos: Position, mut ticket: Ticket) -> Level {
        ticket.set_created_at(self.now);
        let seq = self.next_seq;
        self.next_seq += 1;

        let set = self.sets.entry(pos).or_default();
        let before = set.min_level();
        set.insert(ticket, seq);
        let after = set.min_level();
        if after < before {
            record(&mut self.changes, pos, true);
        }
        after
    }

    /// Remove the ticket equal to `ticket` from `pos`. Returns `false` if
    /// there was none.
    pub fn release(&mut self, pos: Position, ticket: &Ticket) -> bool {
        let Some(set) = self.sets.get_mut(&pos) else {
            return false;
        };
        let before = set.min_level();
        if !set.remove(ticket) {
            return false;
        }
        let after = set.min_level();
        if set.is_empty() {
            self.sets.remove(&pos);
        }
        if after != before {
            record(&mut self.changes, pos, false);
        }
        true
    }

    /// Advance the clock one tick and drop expired tickets. Returns how
    /// many expired.
    pub fn tick(&mut self) -> usize {
        self.now = self.now.next();
        let now = self.now;
        let Self { sets, changes, .. } = self;
        let mut expired = 0;
        sets.retain(|&pos, set| {
            let before = set.min_level();
            let dropped = set.remove_expired(now);
            if dropped > 0 {
                expired += dropped;
                if set.min_level() != before {
                    record(changes, pos, false);
                }
            }
            !set.is_empty()
        });
        if expired > 0 {
            trace!(tick = %now, expired, "tickets expired");
        }
        expired
    }

    /// Minimum ticket level at `pos`, or [`NO_SOURCE`] if it has none.
    pub fn min_level(&self, pos: Position) -> Level {
        self.sets.get(&pos).map_or(NO_SOURCE, TicketSet::min_level)
    }

    /// `true` if a ticket equal to `ticket` is held at `pos`.
    pub fn contains(&self, pos: Position, ticket: &Ticket) -> bool {
        self.sets.get(&pos).is_some_and(|set| set.contains(ticket))
    }

    /// Tickets at `pos`, lowest level first.
    pub fn tickets(&self, pos: Position) -> impl Iterator<Item = &Ticket> {
        self.sets.get(&pos).into_iter().flat_map(TicketSet::iter)
    }

    /// Debug description of `pos`: its lowest ticket or `"no_ticket"`.
    pub fn summary(&self, pos: Position) -> String {
        match self.sets.get(&pos).and_then(TicketSet::first) {
            Some(ticket) => ticket.to_string(),
            None => "no_ticket".to_owned(),
        }
    }

    /// The current tick.
    pub fn now(&self) -> TickId {
        self.now
    }

    /// Number of positions holding at least one ticket.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// `true` when no ticket is held anywhere.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Total number of tickets across all positions.
    pub fn ticket_count(&self) -> usize {
        self.sets.values().map(TicketSet::len).sum()
    }

    /// Positions holding tickets.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.sets.keys().copied()
    }

    /// `true` if source changes are waiting to be taken.
    pub fn has_source_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Take every recorded `(position, is_decrease)` change in first-change
    /// order. `is_decrease` holds only if every change to that position
    /// since the last take lowered its minimum.
    pub fn take_source_changes(&mut self) -> Vec<(Position, bool)> {
        std::mem::take(&mut self.changes).into_iter().collect()
    }
}
