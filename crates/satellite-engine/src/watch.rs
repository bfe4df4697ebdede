//! Watch-event sources.
//!
//! A source is a byte stream of concatenated JSON watch events, the shape
//! emitted by `kubectl get <kind> --watch --output-watch-events -o json`:
//!
//! ```text
//! {"type": "ADDED", "object": {...}}
//! {"type": "MODIFIED", "object": {...}}
//! {"type": "DELETED", "object": {...}}
//! {"type": "DELETED", "key": {"kind": "Pod", "namespace": "shop", "name": "web-0"}}
//! ```
//!
//! Each source is read on its own thread and feeds one [`EventHandler`].
//! Events that parse as JSON but cannot be decoded are logged and skipped.
//! A JSON syntax error ends the source, since the stream position is lost.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use satellite_core::WatchSourceConfig;
use satellite_store::{EntityStore, EventHandler};
use satellite_types::{DecodeError, DeleteInput, Entity, EntityKey, EntityKind};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Path that selects standard input instead of a file.
pub const STDIN_PATH: &str = "-";

/// Type tag of a watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    /// An object appeared.
    Added,
    /// An object changed.
    Modified,
    /// An object was removed.
    Deleted,
    /// Progress marker carrying no object change.
    Bookmark,
    /// The watch itself reported an error.
    Error,
}

/// Wire form of a watch event.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: WatchEventType,
    #[serde(default)]
    object: Option<Value>,
    #[serde(default)]
    key: Option<EntityKey>,
}

/// A decoded watch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// An object appeared.
    Added(Entity),
    /// An object changed.
    Modified(Entity),
    /// An object was removed.
    Deleted(DeleteInput),
    /// Progress marker; ignored.
    Bookmark,
    /// Error reported by the watch; carries the raw status object.
    Error(Value),
}

/// Errors decoding a single watch event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The event envelope is not a watch event.
    #[error("malformed watch event: {source}")]
    Envelope {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The event carries neither an object nor a tombstone key.
    #[error("{event_type:?} event has no object")]
    MissingObject {
        /// Type tag of the offending event.
        event_type: WatchEventType,
    },

    /// The object could not be decoded.
    #[error("undecodable object: {source}")]
    Object {
        /// The underlying decode error.
        #[from]
        source: DecodeError,
    },
}

/// Per-source counters reported when a source ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Events that changed the store.
    pub applied: u64,
    /// Events that left the store untouched: bookmarks, watch errors,
    /// undecodable events, unresolvable entities, deletes of absent keys.
    pub skipped: u64,
}

/// Decode one watch event. `hint` is the kind assumed for objects that do
/// not state their own.
///
/// # Errors
///
/// Returns [`EventError`] if the envelope or the object cannot be decoded.
pub fn decode_event(raw: Value, hint: Option<EntityKind>) -> Result<WatchEvent, EventError> {
    let raw: RawEvent = serde_json::from_value(raw)?;
    let event_type = raw.event_type;

    let event = match event_type {
        WatchEventType::Bookmark => WatchEvent::Bookmark,
        WatchEventType::Error => WatchEvent::Error(raw.object.unwrap_or(Value::Null)),
        WatchEventType::Added | WatchEventType::Modified => {
            let object = raw.object.ok_or(EventError::MissingObject { event_type })?;
            let entity = Entity::from_json(&object, hint)?;
            if event_type == WatchEventType::Added {
                WatchEvent::Added(entity)
            } else {
                WatchEvent::Modified(entity)
            }
        }
        WatchEventType::Deleted => match (raw.object, raw.key) {
            (Some(object), _) => WatchEvent::Deleted(Entity::from_json(&object, hint)?.into()),
            (None, Some(key)) => WatchEvent::Deleted(key.into()),
            (None, None) => return Err(EventError::MissingObject { event_type }),
        },
    };
    Ok(event)
}

/// Forward one event to `handler`. Returns whether the store changed.
pub fn dispatch(handler: &EventHandler, event: WatchEvent) -> bool {
    match event {
        WatchEvent::Added(entity) => handler.on_add(entity),
        WatchEvent::Modified(entity) => handler.on_update(None, entity),
        WatchEvent::Deleted(input) => handler.on_delete(input),
        WatchEvent::Bookmark => {
            debug!(watched = %handler.kind(), "Bookmark");
            false
        }
        WatchEvent::Error(status) => {
            warn!(watched = %handler.kind(), status = %status, "Watch reported an error");
            false
        }
    }
}

/// Read events from `reader` until end of stream, feeding `handler`.
/// Objects without a `kind` are taken to be of the handler's kind.
pub fn consume<R: Read>(reader: R, handler: &EventHandler) -> SourceStats {
    let hint = Some(handler.kind());
    let mut stats = SourceStats::default();
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();

    for item in stream {
        let raw = match item {
            Ok(raw) => raw,
            Err(err) => {
                warn!(watched = %handler.kind(), error = %err, "Unreadable watch stream, stopping source");
                break;
            }
        };
        let applied = match decode_event(raw, hint) {
            Ok(event) => dispatch(handler, event),
            Err(err) => {
                warn!(watched = %handler.kind(), error = %err, "Skipping watch event");
                false
            }
        };
        if applied {
            stats.applied = stats.applied.saturating_add(1);
        } else {
            stats.skipped = stats.skipped.saturating_add(1);
        }
    }
    stats
}

/// Open a source path for reading. [`STDIN_PATH`] selects standard input.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened.
pub fn open(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    if path == Path::new(STDIN_PATH) {
        return Ok(Box::new(io::stdin()));
    }
    let file = File::open(path)?;
    info!(path = %path.display(), "Opened watch source");
    Ok(Box::new(BufReader::new(file)))
}

// ---------------------------------------------------------------------------
// Reader threads
// ---------------------------------------------------------------------------

/// Completion report sent when a source reaches end of stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEnded {
    /// Configured path of the source.
    pub path: PathBuf,
    /// Counters for the whole stream.
    pub stats: SourceStats,
}

/// A watch source opened and bound to its store handler, not yet read.
pub struct Source {
    path: PathBuf,
    reader: Box<dyn Read + Send>,
    handler: EventHandler,
}

impl Source {
    /// Open the configured source and bind it to a handler on `store`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the source cannot be opened.
    pub fn open(config: &WatchSourceConfig, store: &Arc<EntityStore>) -> io::Result<Self> {
        Ok(Self {
            path: config.path.clone(),
            reader: open(&config.path)?,
            handler: store.handler(config.kind),
        })
    }

    /// Configured path of this source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the source on a dedicated thread. `done` receives a
    /// [`SourceEnded`] once the stream ends.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the thread cannot be spawned.
    pub fn spawn(self, done: UnboundedSender<SourceEnded>) -> io::Result<JoinHandle<()>> {
        let name = format!("watch-{}", self.handler.kind());
        thread::Builder::new().name(name).spawn(move || {
            let stats = consume(self.reader, &self.handler);
            // The receiver is gone only when the engine is already exiting.
            let _ = done.send(SourceEnded {
                path: self.path,
                stats,
            });
        })
    }
}
