//! Throttled task scheduling for cubeload.
//!
//! Work is keyed by [`Position`](cubeload_core::Position). The
//! [`TaskQueue`] guarantees at most one queued-or-running action per key,
//! replaces stale queued work when a newer request arrives, and caps how
//! many actions of each [`Lane`] run at once. The [`Scheduler`] couples the
//! queue with a [`WorkerPool`] and an owner-side hand-off channel so that
//! work runs off the owning thread while every state change stays on it.
//!
//! # Threading
//!
//! ```text
//! owner ──pump()──► WorkerPool ──runner(&action)──► OwnerHandle::run
//!   ▲                                                     │
//!   └──────────── drain_completed() ◄── OwnerQueue ◄──────┘
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handoff;
pub mod pool;
pub mod queue;
pub mod scheduler;

pub use config::{ConfigError, SchedulerConfig};
pub use error::SchedError;
pub use handoff::{OwnerHandle, OwnerQueue};
pub use pool::WorkerPool;
pub use queue::{Dispatch, Lane, SchedulerStats, TaskQueue};
pub use scheduler::{Completed, Runner, Scheduler};
