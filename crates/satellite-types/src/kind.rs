//! The closed set of entity kinds the graph understands.
//!
//! Every kind is described once in [`KIND_TABLE`]: its wire name and whether
//! it lives inside a namespace. Key extraction, decoding, and the graph rule
//! table all consult this table instead of branching on kinds ad hoc.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Kind of an observed entity.
///
/// Serialized as the kind's wire name (e.g. `"ReplicaSet"`), which is also
/// the value of the `kind` field on the watched objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EntityKind {
    /// A workload instance scheduled onto a node.
    Pod,
    /// A replica controller that owns pods.
    ReplicaSet,
    /// A rollout controller that owns replica sets.
    Deployment,
    /// A cluster-scoped machine that runs pods.
    Node,
    /// A label-selecting endpoint in front of pods.
    Service,
    /// A bag of configuration data mounted into pods.
    ConfigMap,
}

/// Static facts about one [`EntityKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    /// The kind being described.
    pub kind: EntityKind,
    /// Wire name as it appears in the object's `kind` field.
    pub name: &'static str,
    /// Whether entities of this kind are scoped to a namespace.
    pub namespaced: bool,
}

const POD: KindInfo = KindInfo {
    kind: EntityKind::Pod,
    name: "Pod",
    namespaced: true,
};
const REPLICA_SET: KindInfo = KindInfo {
    kind: EntityKind::ReplicaSet,
    name: "ReplicaSet",
    namespaced: true,
};
const DEPLOYMENT: KindInfo = KindInfo {
    kind: EntityKind::Deployment,
    name: "Deployment",
    namespaced: true,
};
const NODE: KindInfo = KindInfo {
    kind: EntityKind::Node,
    name: "Node",
    namespaced: false,
};
const SERVICE: KindInfo = KindInfo {
    kind: EntityKind::Service,
    name: "Service",
    namespaced: true,
};
const CONFIG_MAP: KindInfo = KindInfo {
    kind: EntityKind::ConfigMap,
    name: "ConfigMap",
    namespaced: true,
};

/// One row per supported kind.
pub const KIND_TABLE: [KindInfo; 6] = [POD, REPLICA_SET, DEPLOYMENT, NODE, SERVICE, CONFIG_MAP];

/// Error returned when a kind name is not part of the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind: {name}")]
pub struct UnknownKind {
    /// The rejected kind name.
    pub name: String,
}

impl EntityKind {
    /// Every supported kind, in table order.
    pub const ALL: [Self; 6] = [
        Self::Pod,
        Self::ReplicaSet,
        Self::Deployment,
        Self::Node,
        Self::Service,
        Self::ConfigMap,
    ];

    /// Return the table row describing this kind.
    pub const fn info(self) -> KindInfo {
        match self {
            Self::Pod => POD,
            Self::ReplicaSet => REPLICA_SET,
            Self::Deployment => DEPLOYMENT,
            Self::Node => NODE,
            Self::Service => SERVICE,
            Self::ConfigMap => CONFIG_MAP,
        }
    }

    /// Return the wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        self.info().name
    }

    /// Whether entities of this kind live inside a namespace.
    pub const fn is_namespaced(self) -> bool {
        self.info().namespaced
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KIND_TABLE
            .iter()
            .find(|row| row.name == s)
            .map(|row| row.kind)
            .ok_or_else(|| UnknownKind { name: s.to_owned() })
    }
}
