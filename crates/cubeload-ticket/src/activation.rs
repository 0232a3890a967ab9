//! Ticket levels propagated into holder lifecycles.

use cubeload_core::{Level, Position, MAX_LOADED_LEVEL, UNLOADED_LEVEL};
use cubeload_graph::{Connectivity, DistanceGraph, LevelStore};
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

use crate::provider::HolderProvider;
use crate::store::TicketStore;

type Batch<H> = IndexSet<H, FxBuildHasher>;

/// Spreads ticket levels over the 26-neighbourhood and pushes the result
/// into a [`HolderProvider`].
///
/// Current levels are not stored here: they are read back from the
/// provider's holders, so the provider stays the single source of truth.
#[derive(Debug)]
pub struct ActivationTracker<H> {
    graph: DistanceGraph,
    pending_finalize: Batch<H>,
}

/// Borrowing view handed to the graph for one `process` call.
struct ActivationLevels<'a, P: HolderProvider> {
    tickets: &'a TicketStore,
    provider: &'a mut P,
    batch: &'a mut Batch<P::Holder>,
}

impl<P: HolderProvider> LevelStore for ActivationLevels<'_, P> {
    fn connectivity(&self) -> Connectivity {
        Connectivity::Full26
    }

    fn source_level(&self, pos: Position) -> Level {
        self.tickets.min_level(pos)
    }

    fn level(&self, pos: Position) -> Level {
        if self.provider.is_unloading(pos) {
            return UNLOADED_LEVEL;
        }
        self.provider
            .holder(pos)
            .map_or(UNLOADED_LEVEL, |h| self.provider.holder_level(&h))
    }

    /// An unloading holder is passed on with `old = UNLOADED_LEVEL`, the
    /// level the graph saw, so the provider can revive it.
    fn set_level(&mut self, pos: Position, level: Level) {
        let old = self.level(pos);
        if old == level {
            return;
        }
        let holder = self.provider.holder(pos);
        if let Some(h) = self.provider.set_level(pos, level, holder, old) {
            self.batch.insert(h);
        }
    }
}

impl<H: Clone + Eq + std::hash::Hash> Default for ActivationTracker<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone + Eq + std::hash::Hash> ActivationTracker<H> {
    /// A tracker over the activation scale: `MAX_LOADED_LEVEL + 2` levels,
    /// sentinel [`UNLOADED_LEVEL`].
    pub fn new() -> Self {
        Self {
            graph: DistanceGraph::new(MAX_LOADED_LEVEL + 2),
            pending_finalize: Batch::default(),
        }
    }

    /// Feed the store's recorded source changes into the graph, then
    /// process up to `budget` positions. Returns the number processed.
    pub fn process<P>(
        &mut self,
        provider: &mut P,
        tickets: &mut TicketStore,
        budget: usize,
    ) -> usize
    where
        P: HolderProvider<Holder = H>,
    {
        let changes = tickets.take_source_changes();
        let mut view = ActivationLevels {
            tickets,
            provider,
            batch: &mut self.pending_finalize,
        };
        for (pos, is_decrease) in changes {
            let level = view.tickets.min_level(pos);
            self.graph.update_source_level(&view, pos, level, is_decrease);
        }
        budget - self.graph.process_updates(&mut view, budget)
    }

    /// Hand every batched holder to [`HolderProvider::finalize`] once.
    /// Returns how many were flushed.
    pub fn finalize<P>(&mut self, provider: &mut P) -> usize
    where
        P: HolderProvider<Holder = H>,
    {
        let batch = std::mem::take(&mut self.pending_finalize);
        for holder in &batch {
            provider.finalize(holder);
        }
        batch.len()
    }

    /// `true` if holders are waiting for [`finalize`](Self::finalize).
    pub fn has_pending_finalize(&self) -> bool {
        !self.pending_finalize.is_empty()
    }

    /// `true` when the graph has nothing left to process.
    pub fn is_settled(&self) -> bool {
        self.graph.is_settled()
    }

    /// Positions waiting in the graph.
    pub fn pending_len(&self) -> usize {
        self.graph.pending_len()
    }
}
