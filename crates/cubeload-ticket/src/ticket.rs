//! Tickets and the per-position ticket set.

use std::fmt;
use std::hash::{Hash, Hasher};

use cubeload_core::{Level, TickId, NO_SOURCE};
use smallvec::SmallVec;

// ── TicketKind ─────────────────────────────────────────────────────

/// Why a ticket exists, and how long it lives without being refreshed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TicketKind {
    name: &'static str,
    timeout: u64,
}

impl TicketKind {
    /// Kept alive by an observer's view.
    pub const PLAYER: Self = Self::new("player", 0);
    /// Pinned explicitly until unforced.
    pub const FORCED: Self = Self::new("forced", 0);
    /// The permanent area around the world origin.
    pub const START: Self = Self::new("start", 0);
    /// Held while lighting work runs.
    pub const LIGHT: Self = Self::new("light", 0);
    /// Left behind by an entity crossing a portal.
    pub const PORTAL: Self = Self::new("portal", 300);
    /// Keeps the destination loaded briefly after a teleport.
    pub const POST_TELEPORT: Self = Self::new("post_teleport", 5);
    /// Short-lived ticket for one-off lookups.
    pub const UNKNOWN: Self = Self::new("unknown", 1);

    /// A custom kind. `timeout` is in ticks; 0 never expires.
    pub const fn new(name: &'static str, timeout: u64) -> Self {
        Self { name, timeout }
    }

    /// Kind name used in summaries.
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// Lifetime in ticks; 0 means the ticket never expires.
    pub const fn timeout(self) -> u64 {
        self.timeout
    }

    /// `true` if tickets of this kind time out.
    pub const fn expires(self) -> bool {
        self.timeout != 0
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ── Ticket ─────────────────────────────────────────────────────────

/// One reason to keep a position at or below some level.
///
/// Identity is `(kind, level, payload)`; the creation tick is metadata and
/// does not take part in equality.
#[derive(Clone, Copy, Debug)]
pub struct Ticket {
    kind: TicketKind,
    level: Level,
    payload: u64,
    created_at: TickId,
}

impl Ticket {
    /// A new ticket. The store stamps the creation tick on registration.
    pub fn new(kind: TicketKind, level: Level, payload: u64) -> Self {
        Self {
            kind,
            level,
            payload,
            created_at: TickId::default(),
        }
    }

    /// The ticket's kind.
    pub fn kind(&self) -> TicketKind {
        self.kind
    }

    /// The level this ticket demands.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Opaque identifier chosen by whoever registered the ticket.
    pub fn payload(&self) -> u64 {
        self.payload
    }

    /// Tick of the last registration or refresh.
    pub fn created_at(&self) -> TickId {
        self.created_at
    }

    pub(crate) fn set_created_at(&mut self, tick: TickId) {
        self.created_at = tick;
    }

    /// First tick at which the ticket is gone, or `None` if it never expires.
    pub fn expiry_tick(&self) -> Option<TickId> {
        self.kind
            .expires()
            .then(|| TickId(self.created_at.0 + self.kind.timeout + 1))
    }

    /// `true` once `now` reaches the expiry tick.
    pub fn is_expired(&self, now: TickId) -> bool {
        self.expiry_tick().is_some_and(|expiry| expiry <= now)
    }
}

impl PartialEq for Ticket {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.level == other.level && self.payload == other.payload
    }
}

impl Eq for Ticket {}

impl Hash for Ticket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.level.hash(state);
        self.payload.hash(state);
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ticket[{} {} ({})] at {}",
            self.kind, self.level, self.payload, self.created_at
        )
    }
}

// ── TicketSet ──────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Entry {
    ticket: Ticket,
    seq: u64,
}

/// The tickets held at one position, sorted by level and then by insertion
/// order. The first ticket defines the position's source level.
#[derive(Clone, Debug, Default)]
pub struct TicketSet {
    entries: SmallVec<[Entry; 4]>,
}

impl TicketSet {
    /// Insert `ticket`, or refresh the creation tick of an equal one.
    ///
    /// `seq` breaks ties between tickets of the same level. Returns `true`
    /// if the ticket was new.
    pub fn insert(&mut self, ticket: Ticket, seq: u64) -> bool {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.ticket == ticket) {
            existing.ticket.created_at = ticket.created_at;
            return false;
        }
        let at = self
            .entries
            .partition_point(|e| (e.ticket.level, e.seq) < (ticket.level, seq));
        self.entries.insert(at, Entry { ticket, seq });
        true
    }

    /// Remove the ticket equal to `ticket`. Returns `true` if one was found.
    pub fn remove(&mut self, ticket: &Ticket) -> bool {
        match self.entries.iter().position(|e| e.ticket == *ticket) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Drop every ticket expired at `now`. Returns how many were dropped.
    pub fn remove_expired(&mut self, now: TickId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.ticket.is_expired(now));
        before - self.entries.len()
    }

    /// `true` if a ticket equal to `ticket` is present.
    pub fn contains(&self, ticket: &Ticket) -> bool {
        self.entries.iter().any(|e| e.ticket == *ticket)
    }

    /// The lowest-level ticket.
    pub fn first(&self) -> Option<&Ticket> {
        self.entries.first().map(|e| &e.ticket)
    }

    /// Level of the first ticket, or [`NO_SOURCE`] when empty.
    pub fn min_level(&self) -> Level {
        self.first().map_or(NO_SOURCE, Ticket::level)
    }

    /// Tickets in order.
    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        self.entries.iter().map(|e| &e.ticket)
    }

    /// Number of tickets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no ticket is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
