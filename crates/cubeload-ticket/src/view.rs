//! View-distance boundary tracking.
//!
//! The view tracker never touches tickets. Each time a section crosses the
//! view boundary it schedules a [`ViewRequest`]; the manager applies the
//! ticket change when the request completes. Per section:
//!
//! ```text
//! NotTracked ──enter──► PendingLoad ──load done──► Loaded
//!      ▲                 │      ▲                    │
//!      │            leave│      │enter               │leave
//!      │                 ▼      │                    │
//!      └──unload done── PendingUnload ◄──────────────┘
//! ```

use std::fmt;

use cubeload_core::{Level, Position};
use cubeload_graph::Connectivity;
use cubeload_sched::{Lane, Scheduler};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::observer::{Granularity, ObserverIndex};
use crate::proximity::{ChangedSet, ProximityTracker};

/// Direction of a boundary crossing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Entered the view.
    Load,
    /// Left the view.
    Unload,
}

impl Transition {
    /// Scheduler lane the request runs in.
    pub fn lane(self) -> Lane {
        match self {
            Self::Load => Lane::Load,
            Self::Unload => Lane::Unload,
        }
    }
}

/// Work scheduled for one boundary crossing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewRequest {
    /// The section that crossed.
    pub pos: Position,
    /// Which way it crossed.
    pub transition: Transition,
}

/// Where a tracked section is in its load/unload cycle. Untracked sections
/// have no state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewState {
    /// A load request is queued or running.
    PendingLoad,
    /// The player ticket is registered.
    Loaded,
    /// An unload request is queued or running.
    PendingUnload,
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingLoad => f.write_str("pending_load"),
            Self::Loaded => f.write_str("loaded"),
            Self::PendingUnload => f.write_str("pending_unload"),
        }
    }
}

/// Crossings emitted by one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Crossings {
    /// Load requests scheduled.
    pub loads: u64,
    /// Unload requests scheduled.
    pub unloads: u64,
}

impl Crossings {
    /// `true` if nothing crossed.
    pub fn is_empty(&self) -> bool {
        self.loads == 0 && self.unloads == 0
    }
}

/// Sections within `view_distance - 2` of an observer, with a scheduled
/// request for every entry and exit.
#[derive(Debug)]
pub struct ViewTracker {
    proximity: ProximityTracker,
    view_distance: Level,
    states: FxHashMap<Position, ViewState>,
    affected: ChangedSet,
}

impl ViewTracker {
    /// Track sections up to `range` away over the full neighbourhood.
    /// `view_distance` is clamped to `range + 2`.
    pub fn new(range: Level, view_distance: Level) -> Self {
        Self {
            proximity: ProximityTracker::new(range, Connectivity::Full26, Granularity::Section),
            view_distance: view_distance.min(range + 2),
            states: FxHashMap::default(),
            affected: ChangedSet::default(),
        }
    }

    /// Current view distance.
    pub fn view_distance(&self) -> Level {
        self.view_distance
    }

    /// `true` if a section at `level` is inside a view of `view_distance`.
    pub fn in_view(level: Level, view_distance: Level) -> bool {
        level.saturating_add(2) <= view_distance
    }

    /// `true` if `pos` is inside the current view.
    pub fn is_within_view(&self, pos: Position) -> bool {
        self.proximity.within_range(pos)
            && Self::in_view(self.proximity.level(pos), self.view_distance)
    }

    /// Propagated distance of `pos` to the nearest observer.
    pub fn level(&self, pos: Position) -> Level {
        self.proximity.level(pos)
    }

    /// See [`ProximityTracker::update_source`].
    pub fn update_source(&mut self, key: Position, occupied: bool) {
        self.proximity.update_source(key, occupied);
    }

    /// Lifecycle state of `pos`.
    pub fn state(&self, pos: Position) -> Option<ViewState> {
        self.states.get(&pos).copied()
    }

    /// Number of tracked sections.
    pub fn tracked_len(&self) -> usize {
        self.states.len()
    }

    /// `true` when no occupancy change is waiting.
    pub fn is_settled(&self) -> bool {
        self.proximity.is_settled()
    }

    /// Apply occupancy changes and schedule a request for every section
    /// whose side of the boundary changed.
    pub fn process(
        &mut self,
        observers: &ObserverIndex,
        scheduler: &mut Scheduler<ViewRequest>,
    ) -> Crossings {
        let mut affected = std::mem::take(&mut self.affected);
        self.proximity.process_tracking(observers, &mut affected);
        let mut crossings = Crossings::default();
        for pos in affected.drain(..) {
            let level = self.proximity.level(pos);
            self.reconcile(pos, level, scheduler, &mut crossings);
        }
        self.affected = affected;
        crossings
    }

    /// Change the view distance and re-evaluate every tracked section
    /// against it.
    pub fn set_view_distance(
        &mut self,
        view_distance: Level,
        scheduler: &mut Scheduler<ViewRequest>,
    ) -> Crossings {
        let view_distance = view_distance.min(self.proximity.range() + 2);
        let mut crossings = Crossings::default();
        if view_distance == self.view_distance {
            return crossings;
        }
        debug!(from = self.view_distance, to = view_distance, "view distance changed");
        self.view_distance = view_distance;
        let members: Vec<(Position, Level)> = self.proximity.members().collect();
        for (pos, level) in members {
            self.reconcile(pos, level, scheduler, &mut crossings);
        }
        crossings
    }

    fn reconcile(
        &mut self,
        pos: Position,
        level: Level,
        scheduler: &mut Scheduler<ViewRequest>,
        crossings: &mut Crossings,
    ) {
        let inside = Self::in_view(level, self.view_distance);
        let state = self.states.get(&pos).copied();
        let transition = match (inside, state) {
            (true, None | Some(ViewState::PendingUnload)) => Transition::Load,
            (false, Some(ViewState::PendingLoad | ViewState::Loaded)) => Transition::Unload,
            _ => {
                scheduler.update_priority(pos, level);
                return;
            }
        };
        let next = match transition {
            Transition::Load => {
                crossings.loads += 1;
                ViewState::PendingLoad
            }
            Transition::Unload => {
                crossings.unloads += 1;
                ViewState::PendingUnload
            }
        };
        self.states.insert(pos, next);
        let request = ViewRequest { pos, transition };
        if scheduler.enqueue(transition.lane(), pos, level, request).is_some() {
            trace!(%pos, ?transition, "superseded queued request");
        }
    }

    /// A load request for `pos` finished. Returns `true` if the player
    /// ticket should be registered: the section is still waiting for this
    /// load and still inside the view. The state becomes `Loaded` in that
    /// case.
    pub fn complete_load(&mut self, pos: Position) -> bool {
        if self.state(pos) != Some(ViewState::PendingLoad) || !self.is_within_view(pos) {
            return false;
        }
        self.states.insert(pos, ViewState::Loaded);
        true
    }

    /// An unload request for `pos` finished. Forgets the section unless a
    /// newer load took over.
    pub fn complete_unload(&mut self, pos: Position) {
        if self.state(pos) == Some(ViewState::PendingUnload) {
            self.states.remove(&pos);
        }
    }
}
