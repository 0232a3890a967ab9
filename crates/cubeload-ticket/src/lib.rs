//! Tickets, trackers, and the ticket manager.
//!
//! A *ticket* pins a position at some level for a reason (a player, a
//! portal, a forced position). The [`TicketStore`] keeps the per-position
//! sets; the trackers turn sources into propagated levels:
//!
//! - [`ActivationTracker`]: ticket levels spread over the 26-neighbourhood
//!   and drive holder lifecycles through a [`HolderProvider`].
//! - [`ProximityTracker`]: observer occupancy spread to a fixed range
//!   (the spawn radius uses it directly).
//! - [`ViewTracker`]: a proximity tracker whose boundary crossings become
//!   scheduled load/unload requests.
//!
//! [`TicketManager`] owns all of them plus the scheduler and runs them in
//! a fixed order on every `process_updates` call.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod activation;
pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod observer;
pub mod provider;
pub mod proximity;
pub mod store;
pub mod ticket;
pub mod view;

pub use activation::ActivationTracker;
pub use config::ManagerConfig;
pub use error::{ConfigError, ManagerError};
pub use manager::TicketManager;
pub use metrics::ManagerMetrics;
pub use observer::{Granularity, ObserverIndex};
pub use provider::HolderProvider;
pub use proximity::ProximityTracker;
pub use store::TicketStore;
pub use ticket::{Ticket, TicketKind, TicketSet};
pub use view::{Crossings, Transition, ViewRequest, ViewState, ViewTracker};
