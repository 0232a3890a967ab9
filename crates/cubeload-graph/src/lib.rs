//! Incremental level propagation for cubeload.
//!
//! [`DistanceGraph`] maintains, for every position of a sparse grid, the
//! minimum of its own source level and its neighbours' levels plus one.
//! Concrete trackers plug their storage and side effects in through the
//! [`LevelStore`] trait and choose a neighbourhood with [`Connectivity`].
//!
//! Updates are queued per level and drained in ascending order with an
//! explicit step budget, so a caller can bound the work done per tick and
//! resume later.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod connectivity;
pub mod graph;
pub mod store;

pub use connectivity::{Connectivity, Neighbours};
pub use graph::DistanceGraph;
pub use store::LevelStore;
