//! Error types for the Satellite engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during startup and the orchestrator run.

use std::path::PathBuf;

/// Top-level error for the Satellite engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: satellite_core::ConfigError,
    },

    /// Logging could not be initialized.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the subscriber failure.
        message: String,
    },

    /// A watch source could not be opened or started.
    #[error("watch source {}: {source}", path.display())]
    Source {
        /// Configured path of the source.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The orchestrator stopped with an error.
    #[error("orchestrator error: {source}")]
    Orchestrator {
        /// The underlying orchestrator error.
        #[from]
        source: satellite_core::OrchestratorError,
    },
}
