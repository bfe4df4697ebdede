//! Concurrent in-memory store of the latest state of every watched entity.
//!
//! The store absorbs upserts and deletes from any number of watch sources
//! and raises a coalescing [`ChangeSignal`] after each mutation that
//! actually changed something. Readers take an owned snapshot via
//! [`EntityStore::list`]; the map itself is never exposed by reference.
//!
//! # Locking
//!
//! One [`RwLock`] guards the map. Writers hold it exclusively for a single
//! insert or remove; [`EntityStore::list`] holds it shared while cloning.
//! The change signal is raised after the lock is released. A poisoned lock
//! is recovered, since every write leaves the map in a consistent state.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use satellite_types::{DeleteInput, Entity, EntityKey, EntityKind};
use tracing::{debug, warn};

use crate::signal::ChangeSignal;

/// Thread-safe map from [`EntityKey`] to the latest observed [`Entity`].
#[derive(Debug, Default)]
pub struct EntityStore {
    /// Latest record per key.
    entities: RwLock<HashMap<EntityKey, Entity>>,
    /// Raised after every effective mutation.
    changes: ChangeSignal,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale-replace the record for the entity's key.
    ///
    /// Entities whose kind cannot be resolved, or whose name is empty, are
    /// dropped with a warning and raise no signal. Returns whether the
    /// entity was stored.
    pub fn upsert(&self, entity: Entity) -> bool {
        let Some(key) = entity.key() else {
            warn!(
                kind = entity.kind_name().unwrap_or("<none>"),
                name = %entity.metadata.name,
                namespace = %entity.metadata.namespace,
                "Dropping entity with unresolvable identity"
            );
            return false;
        };

        debug!(key = %key, "Upserting entity");
        self.write().insert(key, entity);
        self.changes.notify();
        true
    }

    /// Remove the record identified by `input`.
    ///
    /// Deleting an absent key is a silent no-op and raises no signal. A
    /// live entity without a resolvable identity is ignored with a warning.
    /// Returns whether a record was removed.
    pub fn delete(&self, input: DeleteInput) -> bool {
        let Some(key) = input.key() else {
            warn!("Ignoring delete for entity with unresolvable identity");
            return false;
        };

        let removed = self.write().remove(&key).is_some();
        if removed {
            debug!(key = %key, "Deleted entity");
            self.changes.notify();
        } else {
            debug!(key = %key, "Delete for absent key ignored");
        }
        removed
    }

    /// Return a copy of one record.
    pub fn get(&self, key: &EntityKey) -> Option<Entity> {
        self.read().get(key).cloned()
    }

    /// Return an owned snapshot of every record, in no particular order.
    pub fn list(&self) -> Vec<Entity> {
        self.read().values().cloned().collect()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// The change signal raised by this store.
    pub const fn changes(&self) -> &ChangeSignal {
        &self.changes
    }

    /// Create an event handler that feeds one watched kind into this store.
    pub fn handler(self: &Arc<Self>, kind: EntityKind) -> EventHandler {
        EventHandler {
            kind,
            store: Arc::clone(self),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EntityKey, Entity>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EntityKey, Entity>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Adapter from add/update/delete notifications of one watched kind to
/// store mutations.
#[derive(Debug, Clone)]
pub struct EventHandler {
    /// Kind this handler was registered for, used in diagnostics.
    kind: EntityKind,
    /// Store receiving the mutations.
    store: Arc<EntityStore>,
}

impl EventHandler {
    /// Kind this handler was registered for.
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// A new entity was observed. Returns whether the store changed.
    pub fn on_add(&self, entity: Entity) -> bool {
        debug!(watched = %self.kind, name = %entity.metadata.name, "Add event");
        self.store.upsert(entity)
    }

    /// An entity changed. The previous state is not consulted; the new
    /// state replaces the record wholesale.
    pub fn on_update(&self, _old: Option<Entity>, new: Entity) -> bool {
        debug!(watched = %self.kind, name = %new.metadata.name, "Update event");
        self.store.upsert(new)
    }

    /// An entity was removed. Returns whether the store changed.
    pub fn on_delete(&self, input: DeleteInput) -> bool {
        debug!(watched = %self.kind, "Delete event");
        self.store.delete(input)
    }
}
