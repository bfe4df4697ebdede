//! Shared type definitions for the Satellite relationship graph.
//!
//! This crate is the single source of truth for the entity model consumed
//! by the store and the graph builder, and for the snapshot document shape
//! written to disk. Graph types flow downstream to `TypeScript` via `ts-rs`
//! for snapshot consumers.
//!
//! # Modules
//!
//! - [`kind`] -- The closed set of entity kinds and their static facts
//! - [`key`] -- Entity identity `(kind, namespace, name)`
//! - [`entity`] -- Decoded entity records and delete payloads
//! - [`graph`] -- Graph nodes, relationships, and the snapshot document

pub mod entity;
pub mod graph;
pub mod key;
pub mod kind;

// Re-export all public types at crate root for convenience.
pub use entity::{
    ConfigMapBody, ConfigMapVolumeSource, DecodeError, DeleteInput, Entity, EntityBody,
    LabelSelector, NodeBody, NodeSpec, NodeStatus, NodeSystemInfo, ObjectMeta, OwnerReference,
    PodBody, PodSpec, PodStatus, ServiceBody, ServiceSpec, Volume, WorkloadBody, WorkloadSpec,
    WorkloadStatus,
};
pub use graph::{Graph, GraphNode, GraphRelationship, RelationshipType};
pub use key::EntityKey;
pub use kind::{EntityKind, KIND_TABLE, KindInfo, UnknownKind};
