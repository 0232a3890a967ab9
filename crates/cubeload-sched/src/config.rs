//! Scheduler configuration and validation.

use cubeload_core::{Level, MAX_LOADED_LEVEL};
use thiserror::Error;

/// Upper bound on explicitly configured worker threads.
pub const MAX_WORKERS: usize = 64;

// ── SchedulerConfig ────────────────────────────────────────────────

/// Configuration for a [`Scheduler`](crate::Scheduler).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of load actions in flight at once. Default: 4.
    pub max_concurrent_loads: usize,
    /// Maximum number of unload actions in flight at once. Default: 32.
    pub max_concurrent_unloads: usize,
    /// Number of worker threads. `None` = auto-detect
    /// (`available_parallelism / 2`, clamped to `[1, 8]`); `Some(0)` runs
    /// every action inline on the thread that calls `pump()`.
    pub worker_count: Option<usize>,
    /// Number of priority buckets. Priorities at or above this are clamped
    /// into the last bucket. Default: `MAX_LOADED_LEVEL + 2`.
    pub priority_levels: Level,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: 4,
            max_concurrent_unloads: 32,
            worker_count: None,
            priority_levels: MAX_LOADED_LEVEL + 2,
        }
    }
}

impl SchedulerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_loads == 0 {
            return Err(ConfigError::ZeroCap { lane: "load" });
        }
        if self.max_concurrent_unloads == 0 {
            return Err(ConfigError::ZeroCap { lane: "unload" });
        }
        if self.priority_levels == 0 {
            return Err(ConfigError::NoPriorityLevels);
        }
        if let Some(n) = self.worker_count {
            if n > MAX_WORKERS {
                return Err(ConfigError::TooManyWorkers {
                    configured: n,
                    max: MAX_WORKERS,
                });
            }
        }
        Ok(())
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Zero means inline execution.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.min(MAX_WORKERS),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                (cpus / 2).clamp(1, 8)
            }
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SchedulerConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A lane's concurrency cap is zero, so it could never run anything.
    #[error("max concurrent {lane}s must be at least 1")]
    ZeroCap {
        /// `"load"` or `"unload"`.
        lane: &'static str,
    },
    /// `priority_levels` is zero.
    #[error("priority_levels must be at least 1")]
    NoPriorityLevels,
    /// `worker_count` is above [`MAX_WORKERS`].
    #[error("worker_count {configured} exceeds maximum of {max}")]
    TooManyWorkers {
        /// The configured count.
        configured: usize,
        /// The largest accepted count.
        max: usize,
    },
}
