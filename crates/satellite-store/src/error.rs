//! Error types for snapshot output.
//!
//! Every filesystem variant carries the path involved so a failed cycle
//! can be diagnosed from the log line alone.

use std::path::PathBuf;

/// Errors that can occur while writing a graph snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The graph could not be serialized.
    #[error("failed to serialize graph: {source}")]
    Serialize {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The temporary file could not be created.
    #[error("failed to create temporary file in {path}: {source}")]
    TempFile {
        /// Directory the temporary file was created in.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Writing or flushing the temporary file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The temporary file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Syncing the temporary file to durable storage failed.
    #[error("failed to sync {path}: {source}")]
    Sync {
        /// The temporary file being synced.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Renaming the temporary file onto the final name failed.
    #[error("failed to rename snapshot into {path}: {source}")]
    Persist {
        /// The final snapshot path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
