//! Ticket manager configuration.

use cubeload_core::{Level, MAX_LOADED_LEVEL};
use cubeload_sched::SchedulerConfig;

use crate::error::ConfigError;

/// Largest tracker range: one level below the activation scale's own
/// maximum, leaving room for the sentinel.
pub const MAX_RANGE: Level = MAX_LOADED_LEVEL;

/// Configuration for a [`TicketManager`](crate::TicketManager).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Column radius within which spawning is allowed. Default: 8.
    pub spawn_range: Level,
    /// Farthest section the view tracker stores. Default: 33.
    pub view_range: Level,
    /// Initial view distance; sections at level `<= view_distance - 2` are
    /// kept loaded. Default: 10.
    pub view_distance: Level,
    /// Maximum activation-graph positions processed per
    /// `process_updates` call. `None` = unbounded.
    pub update_budget: Option<usize>,
    /// Throttling and worker settings.
    pub scheduler: SchedulerConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            spawn_range: 8,
            view_range: 33,
            view_distance: 10,
            update_budget: None,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("spawn_range", self.spawn_range), ("view_range", self.view_range)] {
            if value == 0 {
                return Err(ConfigError::ZeroRange { name });
            }
            if value > MAX_RANGE {
                return Err(ConfigError::RangeTooLarge {
                    name,
                    value,
                    max: MAX_RANGE,
                });
            }
        }
        if self.view_distance > self.view_range + 2 {
            return Err(ConfigError::ViewDistanceOutOfRange {
                value: self.view_distance,
                range: self.view_range,
            });
        }
        if self.update_budget == Some(0) {
            return Err(ConfigError::ZeroBudget);
        }
        self.scheduler.validate()?;
        Ok(())
    }

    /// The per-call activation budget, `usize::MAX` when unbounded.
    pub fn resolved_update_budget(&self) -> usize {
        self.update_budget.unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(ManagerConfig::default().validate(), Ok(()));
        assert_eq!(ManagerConfig::default().resolved_update_budget(), usize::MAX);
    }

    #[test]
    fn ranges_checked() {
        let cfg = ManagerConfig {
            spawn_range: 0,
            ..ManagerConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroRange {
                name: "spawn_range"
            })
        );

        let cfg = ManagerConfig {
            view_range: 45,
            ..ManagerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeTooLarge { name: "view_range", value: 45, .. })
        ));
    }

    #[test]
    fn view_distance_must_fit_range() {
        let cfg = ManagerConfig {
            view_range: 6,
            view_distance: 9,
            ..ManagerConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ViewDistanceOutOfRange { value: 9, range: 6 })
        );
    }

    #[test]
    fn zero_budget_rejected() {
        let cfg = ManagerConfig {
            update_budget: Some(0),
            ..ManagerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroBudget));
    }

    #[test]
    fn scheduler_errors_propagate() {
        let mut cfg = ManagerConfig::default();
        cfg.scheduler.max_concurrent_loads = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Scheduler(cubeload_sched::ConfigError::ZeroCap { lane: "load" }))
        );
    }
}
