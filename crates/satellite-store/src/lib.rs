//! State and output layer for the Satellite relationship graph.
//!
//! Watch sources write into the [`EntityStore`]; the orchestrator waits on
//! its [`ChangeSignal`], builds a graph from a store snapshot, and hands the
//! result to a [`SnapshotSink`] such as the [`SnapshotEmitter`].
//!
//! ```text
//! watch source --> EventHandler --> EntityStore --(ChangeSignal)--> orchestrator
//!                                                                      |
//!                                          SnapshotEmitter <-- Graph <-+
//! ```
//!
//! # Modules
//!
//! - [`entity_store`] -- Concurrent entity map and per-kind event handlers
//! - [`signal`] -- Coalescing change notification
//! - [`snapshot`] -- Atomic JSON snapshot files
//! - [`error`] -- Snapshot error types

pub mod entity_store;
pub mod error;
pub mod signal;
pub mod snapshot;

// Re-export primary types for convenience.
pub use entity_store::{EntityStore, EventHandler};
pub use error::SnapshotError;
pub use signal::ChangeSignal;
pub use snapshot::{FileSync, SnapshotEmitter, SnapshotSink, SyncAll};
