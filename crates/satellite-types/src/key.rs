//! Entity identity.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::kind::EntityKind;

/// Unique identity of an observed entity: `(kind, namespace, name)`.
///
/// Equality and ordering are structural, so the key can be used directly as
/// a map key and gives a stable sort order for graph output. The namespace
/// is empty for cluster-scoped kinds such as [`EntityKind::Node`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityKey {
    /// Kind of the entity.
    pub kind: EntityKind,
    /// Namespace, or empty for cluster-scoped kinds. Omitted from JSON when
    /// empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Name, unique within `(kind, namespace)`.
    pub name: String,
}

impl EntityKey {
    /// Build a key, dropping the namespace for cluster-scoped kinds.
    pub fn new(kind: EntityKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = if kind.is_namespaced() {
            namespace.into()
        } else {
            String::new()
        };
        Self {
            kind,
            namespace,
            name: name.into(),
        }
    }

    /// Build a key for a cluster-scoped entity.
    pub fn cluster(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::new(kind, String::new(), name)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{} {}", self.kind, self.name)
        } else {
            write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
        }
    }
}
