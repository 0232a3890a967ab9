//! Error types for manager construction.

use cubeload_core::Level;
use cubeload_sched::SchedError;
use thiserror::Error;

/// Errors detected during [`ManagerConfig::validate()`](crate::ManagerConfig::validate).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A tracker range is zero.
    #[error("{name} must be at least 1")]
    ZeroRange {
        /// Which range.
        name: &'static str,
    },
    /// A tracker range leaves no room for the sentinel level.
    #[error("{name} {value} exceeds maximum of {max}")]
    RangeTooLarge {
        /// Which range.
        name: &'static str,
        /// The configured value.
        value: Level,
        /// The largest accepted value.
        max: Level,
    },
    /// The view distance reaches past what the view tracker stores.
    #[error("view_distance {value} exceeds view_range {range} + 2")]
    ViewDistanceOutOfRange {
        /// The configured view distance.
        value: Level,
        /// The configured view range.
        range: Level,
    },
    /// An update budget of zero would never make progress.
    #[error("update_budget must be at least 1")]
    ZeroBudget,
    /// The scheduler configuration is invalid.
    #[error("scheduler: {0}")]
    Scheduler(#[from] cubeload_sched::ConfigError),
}

/// Errors from [`TicketManager::new`](crate::TicketManager::new).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The worker pool could not be started.
    #[error("scheduler: {0}")]
    Sched(#[from] SchedError),
}
