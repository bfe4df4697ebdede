//! Configuration, revisions, and orchestration for Satellite.
//!
//! This crate owns the loop that turns store changes into snapshot files:
//! wait for a change, take a revision, build, emit, repeat, and run one
//! last cycle on shutdown.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `satellite-config.yaml` into
//!   strongly-typed structs.
//! - [`revision`] -- Strictly increasing graph revision counter.
//! - [`shutdown`] -- Shared shutdown control.
//! - [`orchestrator`] -- The build-and-emit loop.

pub mod config;
pub mod orchestrator;
pub mod revision;
pub mod shutdown;

// Re-export primary types for convenience.
pub use config::{ConfigError, LogFormat, SatelliteConfig, WatchSourceConfig};
pub use orchestrator::{CycleReport, Orchestrator, OrchestratorError, RunSummary};
pub use revision::{RevisionCounter, RevisionError};
pub use shutdown::{Shutdown, ShutdownReason};
