//! Atomic snapshot output.
//!
//! Each [`Graph`] is written as one pretty-printed JSON document named
//! `graph-<YYYYMMDD-HHMMSS>.json`. The bytes go to a uniquely named
//! temporary file in the same directory, which is flushed, synced, and then
//! renamed onto the final name. Readers therefore see either the complete
//! previous file or the complete new one, never a partial write. Any
//! failure before the rename removes the temporary file.
//!
//! Two snapshots emitted within the same second share a name; the later one
//! replaces the earlier.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use satellite_types::Graph;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::SnapshotError;

/// Prefix shared by final and temporary snapshot files.
const FILE_PREFIX: &str = "graph-";

/// Suffix of temporary files while they are being written.
const TEMP_SUFFIX: &str = ".json.tmp";

/// `strftime` pattern of the timestamp embedded in snapshot names.
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Destination for built graphs.
pub trait SnapshotSink: Send + Sync {
    /// Persist one graph and return where it was written.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] if the graph could not be persisted.
    fn write(&self, graph: &Graph) -> Result<PathBuf, SnapshotError>;
}

impl<T: SnapshotSink + ?Sized> SnapshotSink for Arc<T> {
    fn write(&self, graph: &Graph) -> Result<PathBuf, SnapshotError> {
        (**self).write(graph)
    }
}

/// Flushes a file's contents to durable storage.
pub trait FileSync: Send + Sync {
    /// Sync `file` to disk.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn sync(&self, file: &File) -> std::io::Result<()>;
}

/// [`FileSync`] backed by [`File::sync_all`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncAll;

impl FileSync for SyncAll {
    fn sync(&self, file: &File) -> std::io::Result<()> {
        file.sync_all()
    }
}

/// Writes graphs into a directory with all-or-nothing visibility.
#[derive(Debug, Clone)]
pub struct SnapshotEmitter<S = SyncAll> {
    /// Directory receiving snapshot files.
    output_dir: PathBuf,
    /// Source of the timestamp embedded in file names.
    clock: fn() -> DateTime<Local>,
    /// Sync step run before the rename.
    sync: S,
}

impl SnapshotEmitter {
    /// Create an emitter writing into `output_dir`, stamping names with the
    /// local wall clock.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            clock: Local::now,
            sync: SyncAll,
        }
    }
}

impl<S: FileSync> SnapshotEmitter<S> {
    /// Replace the clock used for file names.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the sync step.
    pub fn with_sync<T: FileSync>(self, sync: T) -> SnapshotEmitter<T> {
        SnapshotEmitter {
            output_dir: self.output_dir,
            clock: self.clock,
            sync,
        }
    }

    /// Final path a snapshot taken at `at` is written to.
    pub fn path_for(&self, at: DateTime<Local>) -> PathBuf {
        self.output_dir.join(file_name(at))
    }

    /// Serialize and atomically persist `graph`.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] naming the failed step. No final file is
    /// created or modified when an error is returned.
    pub fn emit(&self, graph: &Graph) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| SnapshotError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let bytes = serde_json::to_vec_pretty(graph)?;

        let mut temp = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.output_dir)
            .map_err(|source| SnapshotError::TempFile {
                path: self.output_dir.clone(),
                source,
            })?;

        write_all(&mut temp, &bytes)?;
        self.sync
            .sync(temp.as_file())
            .map_err(|source| SnapshotError::Sync {
                path: temp.path().to_path_buf(),
                source,
            })?;

        let path = self.path_for((self.clock)());
        temp.persist(&path).map_err(|err| SnapshotError::Persist {
            path: path.clone(),
            source: err.error,
        })?;

        info!(
            path = %path.display(),
            revision = graph.revision,
            nodes = graph.nodes.len(),
            relationships = graph.relationships.len(),
            "Snapshot written"
        );
        Ok(path)
    }
}

impl<S: FileSync> SnapshotSink for SnapshotEmitter<S> {
    fn write(&self, graph: &Graph) -> Result<PathBuf, SnapshotError> {
        self.emit(graph)
    }
}

fn write_all(temp: &mut NamedTempFile, bytes: &[u8]) -> Result<(), SnapshotError> {
    let path = temp.path().to_path_buf();
    let file = temp.as_file_mut();
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .map_err(|source| SnapshotError::Write { path, source })
}

/// Snapshot file name for a timestamp.
pub fn file_name(at: DateTime<Local>) -> String {
    format!("{FILE_PREFIX}{}.json", at.format(TIMESTAMP_FORMAT))
}
