//! Cubeload: ticket-driven loading of a sparse 3D grid around moving
//! observers.
//!
//! This is the facade crate that re-exports the public API of every
//! cubeload sub-crate. Most hosts only need this one dependency.
//!
//! # Quick start
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! use cubeload::prelude::*;
//!
//! // A host that keeps one level per live position.
//! #[derive(Default)]
//! struct Grid {
//!     levels: HashMap<Position, Level>,
//! }
//!
//! impl HolderProvider for Grid {
//!     type Holder = Position;
//!
//!     fn is_unloading(&self, _pos: Position) -> bool {
//!         false
//!     }
//!     fn holder(&self, pos: Position) -> Option<Position> {
//!         self.levels.contains_key(&pos).then_some(pos)
//!     }
//!     fn holder_level(&self, holder: &Position) -> Level {
//!         self.levels.get(holder).copied().unwrap_or(UNLOADED_LEVEL)
//!     }
//!     fn set_level(
//!         &mut self,
//!         pos: Position,
//!         level: Level,
//!         _: Option<Position>,
//!         _: Level,
//!     ) -> Option<Position> {
//!         if level >= UNLOADED_LEVEL {
//!             self.levels.remove(&pos);
//!             None
//!         } else {
//!             self.levels.insert(pos, level);
//!             Some(pos)
//!         }
//!     }
//!     fn finalize(&mut self, _holder: &Position) {}
//! }
//!
//! let config = ManagerConfig {
//!     view_range: 4,
//!     view_distance: 3,
//!     scheduler: SchedulerConfig {
//!         worker_count: Some(0),
//!         ..SchedulerConfig::default()
//!     },
//!     ..ManagerConfig::default()
//! };
//! let mut grid = Grid::default();
//! let mut manager = TicketManager::new(config).unwrap();
//!
//! manager.update_observer_position(ObserverId(1), Position::new(0, 0, 0));
//! assert!(manager.run_until_idle(&mut grid, Duration::from_secs(10)));
//! assert_eq!(manager.view_state(Position::new(1, 1, 1)), Some(ViewState::Loaded));
//! assert_eq!(grid.levels[&Position::new(0, 0, 0)], PLAYER_TICKET_LEVEL);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cubeload-core` | Positions, levels, IDs |
//! | [`graph`] | `cubeload-graph` | Incremental distance graph and connectivity |
//! | [`sched`] | `cubeload-sched` | Keyed throttling scheduler and worker pool |
//! | [`ticket`] | `cubeload-ticket` | Tickets, trackers, and the ticket manager |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Positions, levels, and identifiers (`cubeload-core`).
pub use cubeload_core as types;

/// The sparse incremental distance graph (`cubeload-graph`).
///
/// [`graph::DistanceGraph`] keeps per-position levels settled against a
/// [`graph::LevelStore`] as sources come and go.
pub use cubeload_graph as graph;

/// Keyed, prioritised, lane-capped scheduling (`cubeload-sched`).
///
/// [`sched::Scheduler`] pairs a [`sched::TaskQueue`] with a
/// [`sched::WorkerPool`]; [`sched::OwnerQueue`] hands work back to the
/// owning thread.
pub use cubeload_sched as sched;

/// Tickets, observer trackers, and the manager (`cubeload-ticket`).
pub use cubeload_ticket as ticket;

/// Common imports for hosting a [`ticket::TicketManager`].
///
/// ```rust
/// use cubeload::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cubeload_core::{
        level_from_distance, Level, ObserverId, Position, TickId, FORCED_TICKET_LEVEL,
        MAX_LOADED_LEVEL, NO_SOURCE, PLAYER_TICKET_LEVEL, TICKET_BASE_LEVEL, UNLOADED_LEVEL,
    };

    // Graph
    pub use cubeload_graph::{Connectivity, DistanceGraph, LevelStore};

    // Scheduling
    pub use cubeload_sched::{Lane, Runner, SchedError, SchedulerConfig};

    // Tickets and manager
    pub use cubeload_ticket::{
        HolderProvider, ManagerConfig, ManagerError, ManagerMetrics, Ticket, TicketKind,
        TicketManager, Transition, ViewRequest, ViewState,
    };
}
