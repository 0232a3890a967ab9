//! The ticket manager: one owner for tickets, trackers, and the scheduler.
//!
//! # Update order
//!
//! Each [`process_updates`](TicketManager::process_updates) call runs:
//!
//! 1. Apply completed view requests (register or release player tickets).
//! 2. Settle the spawn-radius tracker.
//! 3. Settle the view tracker, scheduling a request per boundary crossing.
//! 4. Feed ticket changes into the activation graph and drain it within
//!    the update budget.
//! 5. If any holder changed, finalize the batch, dispatch, and return.
//! 6. Release throttle slots whose holder became ready.
//! 7. Dispatch whatever the lane caps allow.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cubeload_core::{
    level_from_distance, Level, ObserverId, Position, FORCED_TICKET_LEVEL, PLAYER_TICKET_LEVEL,
};
use cubeload_sched::{Completed, Lane, Runner, Scheduler};
use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashSet};
use tracing::{debug, trace};

use crate::activation::ActivationTracker;
use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::metrics::ManagerMetrics;
use crate::observer::{Granularity, ObserverIndex};
use crate::provider::HolderProvider;
use crate::proximity::ProximityTracker;
use crate::store::TicketStore;
use crate::ticket::{Ticket, TicketKind};
use crate::view::{Crossings, Transition, ViewRequest, ViewState, ViewTracker};

fn player_ticket(pos: Position) -> Ticket {
    Ticket::new(TicketKind::PLAYER, PLAYER_TICKET_LEVEL, pos.packed())
}

fn forced_ticket(pos: Position) -> Ticket {
    Ticket::new(TicketKind::FORCED, FORCED_TICKET_LEVEL, pos.packed())
}

/// Owns every ticket, tracker, and the view scheduler for one world.
///
/// All mutation happens through `&mut self` on the owning thread; only the
/// runner hook executes elsewhere.
pub struct TicketManager<P: HolderProvider> {
    config: ManagerConfig,
    tickets: TicketStore,
    observers: ObserverIndex,
    activation: ActivationTracker<P::Holder>,
    spawn: ProximityTracker,
    view: ViewTracker,
    scheduler: Scheduler<ViewRequest>,
    forced: FxHashSet<Position>,
    /// Loaded sections holding their load slot until the holder is ready.
    awaiting_ready: IndexSet<Position, FxBuildHasher>,
    metrics: ManagerMetrics,
}

impl<P: HolderProvider> TicketManager<P> {
    /// A manager whose view requests do no off-thread work.
    pub fn new(config: ManagerConfig) -> Result<Self, ManagerError> {
        let runner: Runner<ViewRequest> = Arc::new(|_: &ViewRequest| {});
        Self::with_runner(config, runner)
    }

    /// A manager running `runner` on the worker pool for every view
    /// request before its ticket change is applied.
    pub fn with_runner(
        config: ManagerConfig,
        runner: Runner<ViewRequest>,
    ) -> Result<Self, ManagerError> {
        config.validate()?;
        let scheduler = Scheduler::new(&config.scheduler, runner)?;
        Ok(Self {
            tickets: TicketStore::new(),
            observers: ObserverIndex::new(),
            activation: ActivationTracker::new(),
            spawn: ProximityTracker::spawn(config.spawn_range),
            view: ViewTracker::new(config.view_range, config.view_distance),
            scheduler,
            forced: FxHashSet::default(),
            awaiting_ready: IndexSet::default(),
            metrics: ManagerMetrics::default(),
            config,
        })
    }

    /// The configuration the manager was built with (view distance
    /// reflects later changes).
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ── Tickets ────────────────────────────────────────────────────

    /// Advance the ticket clock one tick, expiring stale tickets. Returns
    /// the number expired.
    pub fn tick(&mut self) -> usize {
        let expired = self.tickets.tick();
        self.metrics.tickets_expired += expired as u64;
        expired
    }

    /// Register a ticket of `kind` at `distance` (level
    /// `TICKET_BASE_LEVEL - distance`). Returns the position's new minimum.
    pub fn register(
        &mut self,
        kind: TicketKind,
        pos: Position,
        distance: u32,
        payload: u64,
    ) -> Level {
        self.register_with_level(kind, pos, level_from_distance(distance), payload)
    }

    /// Release a ticket registered with [`register`](Self::register).
    pub fn release(
        &mut self,
        kind: TicketKind,
        pos: Position,
        distance: u32,
        payload: u64,
    ) -> bool {
        self.release_with_level(kind, pos, level_from_distance(distance), payload)
    }

    /// Register a ticket at an explicit level.
    pub fn register_with_level(
        &mut self,
        kind: TicketKind,
        pos: Position,
        level: Level,
        payload: u64,
    ) -> Level {
        self.tickets.register(pos, Ticket::new(kind, level, payload))
    }

    /// Release a ticket registered with
    /// [`register_with_level`](Self::register_with_level).
    pub fn release_with_level(
        &mut self,
        kind: TicketKind,
        pos: Position,
        level: Level,
        payload: u64,
    ) -> bool {
        self.tickets.release(pos, &Ticket::new(kind, level, payload))
    }

    /// Pin (`add`) or unpin `pos` with a forced ticket. Returns `false` if
    /// it already was in the requested state.
    pub fn force(&mut self, pos: Position, add: bool) -> bool {
        if add {
            if !self.forced.insert(pos) {
                return false;
            }
            self.tickets.register(pos, forced_ticket(pos));
            true
        } else {
            self.forced.remove(&pos) && self.tickets.release(pos, &forced_ticket(pos))
        }
    }

    /// `true` if `pos` is forced.
    pub fn is_forced(&self, pos: Position) -> bool {
        self.forced.contains(&pos)
    }

    /// Minimum ticket level at `pos`.
    pub fn min_level(&self, pos: Position) -> Level {
        self.tickets.min_level(pos)
    }

    /// Debug description of the lowest ticket at `pos`.
    pub fn ticket_summary(&self, pos: Position) -> String {
        self.tickets.summary(pos)
    }

    /// Read access to the ticket store.
    pub fn tickets(&self) -> &TicketStore {
        &self.tickets
    }

    // ── Observers ──────────────────────────────────────────────────

    /// Move observer `id` to section `pos`, starting to track it if new.
    /// Returns `false` if it was already there.
    pub fn update_observer_position(&mut self, id: ObserverId, pos: Position) -> bool {
        let previous = self.observers.update(id, pos);
        if previous == Some(pos) {
            return false;
        }
        if let Some(old) = previous {
            self.occupancy_changed(old);
        }
        self.occupancy_changed(pos);
        true
    }

    /// Stop tracking observer `id`. Returns `false` if it was unknown.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        match self.observers.remove(id) {
            Some(old) => {
                self.occupancy_changed(old);
                true
            }
            None => false,
        }
    }

    fn occupancy_changed(&mut self, section: Position) {
        let column = section.column();
        self.spawn
            .update_source(column, self.observers.is_occupied(column, Granularity::Column));
        self.view
            .update_source(section, self.observers.is_occupied(section, Granularity::Section));
    }

    /// Change the view distance; sections crossing the new boundary are
    /// scheduled on the next dispatch.
    pub fn set_view_distance(&mut self, view_distance: Level) {
        let crossings = self.view.set_view_distance(view_distance, &mut self.scheduler);
        self.config.view_distance = self.view.view_distance();
        self.count_crossings(&crossings);
    }

    /// Number of columns inside the spawn radius of some observer.
    pub fn spawn_eligible_count(&self) -> usize {
        self.spawn.len()
    }

    /// `true` if no observer is within spawn range of the column of `pos`.
    pub fn is_outside_spawn_radius(&self, pos: Position) -> bool {
        !self.spawn.within_range(pos)
    }

    /// View lifecycle state of section `pos`.
    pub fn view_state(&self, pos: Position) -> Option<ViewState> {
        self.view.state(pos)
    }

    // ── Processing ─────────────────────────────────────────────────

    /// Run one update pass with the configured budget. Returns `true` if
    /// anything changed.
    pub fn process_updates(&mut self, provider: &mut P) -> bool {
        let budget = self.config.resolved_update_budget();
        self.process_updates_with_budget(provider, budget)
    }

    /// Run one update pass processing at most `budget` activation-graph
    /// positions.
    pub fn process_updates_with_budget(&mut self, provider: &mut P, budget: usize) -> bool {
        let mut changed = false;

        for done in self.scheduler.drain_completed() {
            self.apply_completion(done);
            changed = true;
        }

        changed |= self.spawn.process_all(&self.observers) > 0;

        let crossings = self.view.process(&self.observers, &mut self.scheduler);
        self.count_crossings(&crossings);
        changed |= !crossings.is_empty();

        let steps = self.activation.process(provider, &mut self.tickets, budget);
        self.metrics.graph_steps += steps as u64;
        changed |= steps > 0;

        if self.activation.has_pending_finalize() {
            let finalized = self.activation.finalize(provider);
            self.metrics.holders_finalized += finalized as u64;
            self.scheduler.pump();
            debug!(
                steps,
                finalized,
                loads = crossings.loads,
                unloads = crossings.unloads,
                "holders updated"
            );
            return true;
        }

        if self.activation.is_settled() {
            changed |= self.release_ready_slots(provider);
        }
        changed |= self.scheduler.pump() > 0;

        if changed {
            debug!(
                steps,
                loads = crossings.loads,
                unloads = crossings.unloads,
                scheduler = %self.scheduler.summary(),
                "updates processed"
            );
        }
        changed
    }

    fn count_crossings(&mut self, crossings: &Crossings) {
        self.metrics.load_requests += crossings.loads;
        self.metrics.unload_requests += crossings.unloads;
    }

    fn apply_completion(&mut self, done: Completed<ViewRequest>) {
        let pos = done.key;
        match done.action.transition {
            Transition::Load => {
                if self.view.complete_load(pos) {
                    self.tickets.register(pos, player_ticket(pos));
                    // A re-entry while this load ran parked a second load.
                    if self.scheduler.waiting_lane(pos) == Some(Lane::Load) {
                        self.scheduler.cancel(pos);
                    }
                    // The slot is held until the holder is ready.
                    self.awaiting_ready.insert(pos);
                    trace!(%pos, "player ticket registered");
                } else {
                    trace!(%pos, "stale load dropped");
                    self.scheduler.complete(pos);
                }
            }
            Transition::Unload => {
                if self.tickets.release(pos, &player_ticket(pos)) {
                    trace!(%pos, "player ticket released");
                }
                self.view.complete_unload(pos);
                self.scheduler.complete(pos);
            }
        }
    }

    /// Complete the slot of every awaiting section whose holder is ready
    /// or whose player ticket is gone.
    fn release_ready_slots(&mut self, provider: &P) -> bool {
        let tickets = &self.tickets;
        let mut released = Vec::new();
        self.awaiting_ready.retain(|&pos| {
            if !tickets.contains(pos, &player_ticket(pos)) {
                released.push(pos);
                return false;
            }
            if provider.is_unloading(pos) {
                return true;
            }
            let holder = provider.holder(pos).unwrap_or_else(|| {
                panic!("player ticket at {pos} has no holder after the activation graph settled")
            });
            if provider.is_ready(&holder) {
                released.push(pos);
                false
            } else {
                true
            }
        });
        for &pos in &released {
            self.scheduler.complete(pos);
        }
        !released.is_empty()
    }

    /// `true` when nothing is queued, running, awaiting readiness, or
    /// waiting to propagate.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
            && self.awaiting_ready.is_empty()
            && self.activation.is_settled()
            && !self.activation.has_pending_finalize()
            && !self.tickets.has_source_changes()
            && self.spawn.is_settled()
            && self.view.is_settled()
    }

    /// Process updates until idle, blocking on worker completions as
    /// needed. Returns `false` on timeout or when progress depends on
    /// something outside the manager (a holder that never becomes ready).
    pub fn run_until_idle(&mut self, provider: &mut P, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let changed = self.process_updates(provider);
            if !changed && self.is_idle() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if !changed {
                if self.scheduler.running_len() == 0 {
                    return false;
                }
                for done in self.scheduler.wait_completed(deadline - now) {
                    self.apply_completion(done);
                }
            }
        }
    }

    // ── Introspection ──────────────────────────────────────────────

    /// One-line scheduler state.
    pub fn scheduler_summary(&self) -> String {
        self.scheduler.summary()
    }

    /// Snapshot of the cumulative counters.
    pub fn metrics(&self) -> ManagerMetrics {
        let stats = self.scheduler.stats();
        ManagerMetrics {
            superseded_requests: stats.replaced,
            dispatched: stats.dispatched,
            completed: stats.completed,
            ..self.metrics
        }
    }

    /// Stop the worker pool. Requests already dispatched still complete.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }
}

impl<P: HolderProvider> fmt::Debug for TicketManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketManager")
            .field("tickets", &self.tickets.len())
            .field("observers", &self.observers.len())
            .field("spawn_eligible", &self.spawn.len())
            .field("view_tracked", &self.view.tracked_len())
            .field("awaiting_ready", &self.awaiting_ready.len())
            .field("scheduler", &self.scheduler.summary())
            .finish()
    }
}
