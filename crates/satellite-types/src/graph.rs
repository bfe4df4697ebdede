//! The derived relationship graph and its snapshot document shape.
//!
//! A [`Graph`] is rebuilt from scratch on every cycle and serialized as one
//! snapshot document. Every node and relationship carries the revision of
//! the build that produced it.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::key::EntityKey;

/// Type of a directed relationship between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum RelationshipType {
    /// Child entity is owned by a controller (pod → replica set).
    OwnedBy,
    /// Pod is scheduled on a node.
    ScheduledOn,
    /// Pod mounts a config map as a volume.
    Mounts,
    /// Service selects a pod by labels.
    Selects,
}

impl RelationshipType {
    /// Return the wire name (`OWNED_BY`, ...).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OwnedBy => "OWNED_BY",
            Self::ScheduledOn => "SCHEDULED_ON",
            Self::Mounts => "MOUNTS",
            Self::Selects => "SELECTS",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GraphNode {
    /// Identity of the entity.
    pub key: EntityKey,
    /// Flat string properties derived from the entity.
    pub properties: BTreeMap<String, String>,
    /// Revision of the build that produced this node.
    pub revision: u64,
}

/// A directed, typed edge between two entity keys.
///
/// The target need not be present as a node: a pod may reference a node
/// that has not been observed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GraphRelationship {
    /// Entity the edge starts from.
    pub source: EntityKey,
    /// Entity the edge points to.
    pub target: EntityKey,
    /// Kind of relationship.
    #[serde(rename = "relationshipType")]
    pub relationship_type: RelationshipType,
    /// Optional edge properties; omitted from JSON when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub properties: Option<BTreeMap<String, String>>,
    /// Revision of the build that produced this edge.
    pub revision: u64,
}

/// Complete graph for one revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Graph {
    /// Nodes, sorted by key.
    pub nodes: Vec<GraphNode>,
    /// Relationships, sorted by `(source, target, type)`.
    pub relationships: Vec<GraphRelationship>,
    /// Revision stamped on this graph.
    #[serde(rename = "graphRevision")]
    pub revision: u64,
}

impl Graph {
    /// Iterate over relationships of one type.
    pub fn relationships_of(
        &self,
        relationship_type: RelationshipType,
    ) -> impl Iterator<Item = &GraphRelationship> {
        self.relationships
            .iter()
            .filter(move |rel| rel.relationship_type == relationship_type)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kind::EntityKind;

    fn sample() -> Graph {
        let pod = EntityKey::new(EntityKind::Pod, "shop", "web-0");
        let node = EntityKey::cluster(EntityKind::Node, "worker-1");
        Graph {
            nodes: vec![GraphNode {
                key: pod.clone(),
                properties: BTreeMap::from([("status.phase".to_owned(), "Running".to_owned())]),
                revision: 3,
            }],
            relationships: vec![GraphRelationship {
                source: pod,
                target: node,
                relationship_type: RelationshipType::ScheduledOn,
                properties: None,
                revision: 3,
            }],
            revision: 3,
        }
    }

    #[test]
    fn document_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["graphRevision"], 3);
        assert_eq!(value["nodes"][0]["key"]["kind"], "Pod");
        assert_eq!(value["nodes"][0]["revision"], 3);

        let rel = &value["relationships"][0];
        assert_eq!(rel["relationshipType"], "SCHEDULED_ON");
        assert!(rel.get("properties").is_none());
        assert!(rel["target"].get("namespace").is_none());
    }

    #[test]
    fn relationship_type_wire_names_match_display() {
        for rt in [
            RelationshipType::OwnedBy,
            RelationshipType::ScheduledOn,
            RelationshipType::Mounts,
            RelationshipType::Selects,
        ] {
            let json = serde_json::to_string(&rt).unwrap();
            assert_eq!(json, format!("\"{rt}\""));
        }
    }

    #[test]
    fn document_round_trips() {
        let graph = sample();
        let text = serde_json::to_string_pretty(&graph).unwrap();
        let back: Graph = serde_json::from_str(&text).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn relationships_filtered_by_type() {
        let graph = sample();
        assert_eq!(graph.relationships_of(RelationshipType::ScheduledOn).count(), 1);
        assert_eq!(graph.relationships_of(RelationshipType::Selects).count(), 0);
    }
}
