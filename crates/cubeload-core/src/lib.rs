//! Core types for the cubeload workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! packed grid [`Position`], the shared [`Level`] scale and its constants,
//! and the small identifier types used by the trackers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod level;
pub mod position;

pub use error::PositionError;
pub use id::{ObserverId, TickId};
pub use level::{
    level_from_distance, Level, FORCED_TICKET_LEVEL, MAX_LOADED_LEVEL, NO_SOURCE,
    PLAYER_TICKET_LEVEL, TICKET_BASE_LEVEL, UNLOADED_LEVEL,
};
pub use position::Position;
