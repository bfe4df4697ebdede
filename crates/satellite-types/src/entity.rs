//! Observed entity records and the payloads that delete them.
//!
//! An [`Entity`] is the latest known state of one watched object, decoded
//! from its JSON form into common metadata plus a kind-specific
//! [`EntityBody`]. Only the fields needed for relationship derivation and
//! node properties are kept; everything else on the wire is ignored.
//!
//! Decoding never fails because of an unsupported kind. Such objects decode
//! to [`EntityBody::Unknown`] and are dropped later, at the store boundary,
//! with a diagnostic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::EntityKey;
use crate::kind::EntityKind;

/// Errors produced while decoding a watched object.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The object has no `metadata` section.
    #[error("object has no metadata")]
    MissingMetadata,

    /// A section of the object did not match the expected shape.
    #[error("malformed {section} for {kind}: {source}")]
    Malformed {
        /// Kind being decoded, or `"object"` before the kind is known.
        kind: String,
        /// Which part of the object failed (`metadata` or `body`).
        section: &'static str,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Reference from a child entity to the entity that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnerReference {
    /// API group/version of the owner.
    pub api_version: String,
    /// Kind name of the owner (may be outside the supported set).
    pub kind: String,
    /// Name of the owner, in the child's namespace.
    pub name: String,
    /// UID of the owner.
    pub uid: String,
    /// Whether the owner is the managing controller.
    pub controller: Option<bool>,
}

/// Metadata shared by every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    /// Object name.
    pub name: String,
    /// Object namespace (empty for cluster-scoped kinds).
    pub namespace: String,
    /// Unique identifier assigned by the source.
    pub uid: String,
    /// Opaque version token of this state.
    pub resource_version: String,
    /// Creation time, when known.
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// Labels used for selection.
    pub labels: BTreeMap<String, String>,
    /// Free-form annotations.
    pub annotations: BTreeMap<String, String>,
    /// Declared owners of this object.
    pub owner_references: Vec<OwnerReference>,
}

// ---------------------------------------------------------------------------
// Pod
// ---------------------------------------------------------------------------

/// Kind-specific fields of a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodBody {
    /// Desired state.
    pub spec: PodSpec,
    /// Observed state.
    pub status: PodStatus,
}

/// Pod scheduling and volume configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSpec {
    /// Node the pod is scheduled on; empty while unscheduled.
    pub node_name: String,
    /// Volumes declared by the pod.
    pub volumes: Vec<Volume>,
}

/// One pod volume. Only config-map sources are retained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    /// Volume name inside the pod.
    pub name: String,
    /// Set when the volume is backed by a config map.
    pub config_map: Option<ConfigMapVolumeSource>,
}

/// Config-map volume source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigMapVolumeSource {
    /// Name of the config map, in the pod's namespace.
    pub name: String,
}

/// Observed pod state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodStatus {
    /// Lifecycle phase (`Pending`, `Running`, ...).
    pub phase: String,
    /// Pod IP address.
    #[serde(rename = "podIP")]
    pub pod_ip: String,
    /// IP address of the hosting node.
    #[serde(rename = "hostIP")]
    pub host_ip: String,
    /// When the pod was acknowledged by its node.
    pub start_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// ReplicaSet / Deployment
// ---------------------------------------------------------------------------

/// Kind-specific fields shared by replica sets and deployments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadBody {
    /// Desired state.
    pub spec: WorkloadSpec,
    /// Observed replica counts.
    pub status: WorkloadStatus,
}

/// Desired replica count and pod selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadSpec {
    /// Desired replica count; unset means the source default.
    pub replicas: Option<i32>,
    /// Pod selector.
    pub selector: Option<LabelSelector>,
}

/// Label selector in `matchLabels` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelSelector {
    /// Labels that must all match.
    pub match_labels: BTreeMap<String, String>,
}

/// Observed replica counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadStatus {
    /// Replicas currently created.
    pub replicas: i32,
    /// Replicas reporting ready.
    pub ready_replicas: i32,
    /// Replicas available to serve.
    pub available_replicas: i32,
    /// Replicas running the latest template (deployments only).
    pub updated_replicas: i32,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Kind-specific fields of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeBody {
    /// Desired state.
    pub spec: NodeSpec,
    /// Observed capacity and system info.
    pub status: NodeStatus,
}

/// Node network configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    /// Pod CIDR range assigned to the node.
    #[serde(rename = "podCIDR")]
    pub pod_cidr: String,
}

/// Observed node resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeStatus {
    /// Total resources, as quantity strings keyed by resource name.
    pub capacity: BTreeMap<String, String>,
    /// Resources available for scheduling.
    pub allocatable: BTreeMap<String, String>,
    /// Software versions reported by the node.
    pub node_info: NodeSystemInfo,
}

/// Software versions reported by a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSystemInfo {
    /// Node agent version.
    pub kubelet_version: String,
    /// Operating system image.
    pub os_image: String,
    /// Container runtime name and version.
    pub container_runtime_version: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Kind-specific fields of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceBody {
    /// Desired state.
    pub spec: ServiceSpec,
}

/// Service exposure and pod selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSpec {
    /// Exposure type (`ClusterIP`, `NodePort`, ...).
    #[serde(rename = "type")]
    pub service_type: String,
    /// Primary cluster IP.
    #[serde(rename = "clusterIP")]
    pub cluster_ip: String,
    /// All cluster IPs.
    #[serde(rename = "clusterIPs")]
    pub cluster_ips: Vec<String>,
    /// Pod selector; `None` when the service has no selector at all.
    pub selector: Option<BTreeMap<String, String>>,
}

// ---------------------------------------------------------------------------
// ConfigMap
// ---------------------------------------------------------------------------

/// Kind-specific fields of a config map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigMapBody {
    /// Configuration entries.
    pub data: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Kind-specific part of an [`Entity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityBody {
    /// A pod.
    Pod(PodBody),
    /// A replica set.
    ReplicaSet(WorkloadBody),
    /// A deployment.
    Deployment(WorkloadBody),
    /// A node.
    Node(NodeBody),
    /// A service.
    Service(ServiceBody),
    /// A config map.
    ConfigMap(ConfigMapBody),
    /// An object whose kind could not be resolved to a supported kind.
    Unknown {
        /// The kind name carried by the object, if any.
        kind: Option<String>,
    },
}

impl EntityBody {
    /// Return the resolved kind, or `None` for [`EntityBody::Unknown`].
    pub const fn kind(&self) -> Option<EntityKind> {
        match self {
            Self::Pod(_) => Some(EntityKind::Pod),
            Self::ReplicaSet(_) => Some(EntityKind::ReplicaSet),
            Self::Deployment(_) => Some(EntityKind::Deployment),
            Self::Node(_) => Some(EntityKind::Node),
            Self::Service(_) => Some(EntityKind::Service),
            Self::ConfigMap(_) => Some(EntityKind::ConfigMap),
            Self::Unknown { .. } => None,
        }
    }
}

/// Latest observed state of one entity.
///
/// Replaced wholesale on every upsert; there is no partial merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Common metadata.
    pub metadata: ObjectMeta,
    /// Kind-specific fields.
    pub body: EntityBody,
}

impl Entity {
    /// Decode a watched object from its JSON form.
    ///
    /// The kind is taken from the object's `kind` field. Watch sources often
    /// strip that field, in which case `hint` (the kind the source watches)
    /// is used. An explicit but unsupported kind wins over the hint and
    /// yields [`EntityBody::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MissingMetadata`] if the object has no
    /// metadata, or [`DecodeError::Malformed`] if a section has the wrong
    /// shape.
    pub fn from_json(object: &Value, hint: Option<EntityKind>) -> Result<Self, DecodeError> {
        let declared = object.get("kind").and_then(Value::as_str);
        let kind = match declared {
            Some(name) => name.parse::<EntityKind>().ok(),
            None => hint,
        };

        let raw_meta = object.get("metadata").ok_or(DecodeError::MissingMetadata)?;
        let metadata =
            ObjectMeta::deserialize(raw_meta).map_err(|source| DecodeError::Malformed {
                kind: declared.map_or_else(|| "object".to_owned(), str::to_owned),
                section: "metadata",
                source,
            })?;

        let body = match kind {
            None => EntityBody::Unknown {
                kind: declared.map(str::to_owned),
            },
            Some(kind) => decode_body(kind, object).map_err(|source| DecodeError::Malformed {
                kind: kind.to_string(),
                section: "body",
                source,
            })?,
        };

        Ok(Self { metadata, body })
    }

    /// Return the resolved kind, if any.
    pub const fn kind(&self) -> Option<EntityKind> {
        self.body.kind()
    }

    /// Kind name for diagnostics: the resolved kind, else whatever the
    /// object declared.
    pub fn kind_name(&self) -> Option<&str> {
        match &self.body {
            EntityBody::Unknown { kind } => kind.as_deref(),
            body => body.kind().map(EntityKind::as_str),
        }
    }

    /// Resolve this entity's identity.
    ///
    /// Returns `None` when the kind is unresolvable or the name is empty.
    /// Cluster-scoped kinds always get an empty namespace.
    pub fn key(&self) -> Option<EntityKey> {
        let kind = self.kind()?;
        if self.metadata.name.is_empty() {
            return None;
        }
        Some(EntityKey::new(
            kind,
            self.metadata.namespace.as_str(),
            self.metadata.name.as_str(),
        ))
    }
}

/// Decode the kind-specific body from the full object.
fn decode_body(kind: EntityKind, object: &Value) -> Result<EntityBody, serde_json::Error> {
    let body = match kind {
        EntityKind::Pod => EntityBody::Pod(PodBody::deserialize(object)?),
        EntityKind::ReplicaSet => EntityBody::ReplicaSet(WorkloadBody::deserialize(object)?),
        EntityKind::Deployment => EntityBody::Deployment(WorkloadBody::deserialize(object)?),
        EntityKind::Node => EntityBody::Node(NodeBody::deserialize(object)?),
        EntityKind::Service => EntityBody::Service(ServiceBody::deserialize(object)?),
        EntityKind::ConfigMap => EntityBody::ConfigMap(ConfigMapBody::deserialize(object)?),
    };
    Ok(body)
}

/// Payload of a delete notification.
///
/// The watch source normally hands over the deleted object itself. When it
/// has lost the object (e.g. after a missed event), it can only supply the
/// last key it knew.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteInput {
    /// The deleted object, as last observed.
    LiveEntity(Box<Entity>),
    /// Tombstone carrying only the identity of the deleted object.
    LastKnownKey(EntityKey),
}

impl DeleteInput {
    /// Resolve the key to delete. `None` if a live entity has no
    /// resolvable identity.
    ///
    /// A tombstone key is normalized like any other key, so a namespace
    /// on a cluster-scoped kind is dropped.
    pub fn key(&self) -> Option<EntityKey> {
        match self {
            Self::LiveEntity(entity) => entity.key(),
            Self::LastKnownKey(key) => Some(EntityKey::new(
                key.kind,
                key.namespace.as_str(),
                key.name.as_str(),
            )),
        }
    }
}

impl From<Entity> for DeleteInput {
    fn from(entity: Entity) -> Self {
        Self::LiveEntity(Box::new(entity))
    }
}

impl From<EntityKey> for DeleteInput {
    fn from(key: EntityKey) -> Self {
        Self::LastKnownKey(key)
    }
}
