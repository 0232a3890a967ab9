//! Cumulative counters for the ticket manager.

/// Counters accumulated since the manager was created.
///
/// Scheduler-side counts (`superseded_requests`, `dispatched`, `completed`)
/// are copied from the scheduler's stats when the snapshot is taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManagerMetrics {
    /// Positions processed by the activation graph.
    pub graph_steps: u64,
    /// Holders passed to `finalize`.
    pub holders_finalized: u64,
    /// Tickets dropped by expiry.
    pub tickets_expired: u64,
    /// Load requests scheduled by the view tracker.
    pub load_requests: u64,
    /// Unload requests scheduled by the view tracker.
    pub unload_requests: u64,
    /// Queued requests replaced by a newer one.
    pub superseded_requests: u64,
    /// Requests handed to the worker pool.
    pub dispatched: u64,
    /// Throttle slots released.
    pub completed: u64,
}
