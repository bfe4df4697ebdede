//! Graph derivation from a store snapshot.
//!
//! [`GraphBuilder::build`] is a pure function of its inputs: the same
//! snapshot and revision always produce an equal [`Graph`], regardless of
//! the order entities appear in. Nodes are sorted by key; relationships are
//! collected in an ordered map keyed by `(source, target, type)`, so
//! duplicate edges collapse and the output is sorted.
//!
//! Relationship targets are computed from the source entity alone and are
//! not required to exist as nodes.

use std::collections::BTreeMap;

use satellite_types::{
    Entity, EntityBody, EntityKey, EntityKind, Graph, GraphNode, GraphRelationship,
    RelationshipType,
};
use tracing::{debug, info, warn};

use crate::index::LabelIndex;
use crate::rules::{self, KindRule, Properties};

/// Property on `OWNED_BY` edges set when the owner is the controller.
const CONTROLLER_PROPERTY: &str = "controller";

/// Property on `MOUNTS` edges listing the pod volume names.
const VOLUME_PROPERTY: &str = "volume";

/// Derives nodes and typed relationships from entity snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Build the graph for `snapshot`, stamping every element with
    /// `revision`.
    ///
    /// Entities whose kind cannot be resolved are skipped with a warning.
    /// If the snapshot holds the same key twice, the last occurrence wins.
    pub fn build(snapshot: &[Entity], revision: u64) -> Graph {
        let entities = resolve(snapshot);

        let nodes: Vec<GraphNode> = entities
            .iter()
            .map(|(key, (entity, rule))| GraphNode {
                key: key.clone(),
                properties: rules::node_properties_for(entity, rule),
                revision,
            })
            .collect();

        let mut index = LabelIndex::new();
        for (key, (entity, _)) in &entities {
            if key.kind == EntityKind::Pod {
                index.insert(key, &entity.metadata.labels);
            }
        }

        let mut edges = EdgeSet::default();
        for (key, (entity, rule)) in &entities {
            owned_by(&mut edges, key, entity, rule);
            if rule.schedules_on {
                scheduled_on(&mut edges, key, entity);
            }
            if rule.mounts {
                mounts(&mut edges, key, entity);
            }
            if rule.selects {
                selects(&mut edges, key, entity, &index);
            }
        }
        let relationships = edges.into_relationships(revision);

        info!(
            revision,
            nodes = nodes.len(),
            relationships = relationships.len(),
            "Built graph"
        );

        Graph {
            nodes,
            relationships,
            revision,
        }
    }
}

/// Key every resolvable entity, keeping the last occurrence of each key.
fn resolve(snapshot: &[Entity]) -> BTreeMap<EntityKey, (&Entity, &'static KindRule)> {
    let mut entities = BTreeMap::new();
    for entity in snapshot {
        let (Some(kind), Some(key)) = (entity.kind(), entity.key()) else {
            warn!(
                kind = entity.kind_name().unwrap_or("<none>"),
                name = %entity.metadata.name,
                "Skipping entity with unresolvable identity"
            );
            continue;
        };
        if entities.insert(key, (entity, rules::rule(kind))).is_some() {
            debug!(name = %entity.metadata.name, "Duplicate key in snapshot, keeping last");
        }
    }
    entities
}

// ---------------------------------------------------------------------------
// Relationship rules
// ---------------------------------------------------------------------------

fn owned_by(edges: &mut EdgeSet, source: &EntityKey, entity: &Entity, rule: &KindRule) {
    if rule.owner_kinds.is_empty() {
        return;
    }
    for owner in &entity.metadata.owner_references {
        let Ok(owner_kind) = owner.kind.parse::<EntityKind>() else {
            continue;
        };
        if !rule.owner_kinds.contains(&owner_kind) || owner.name.is_empty() {
            continue;
        }
        let target = EntityKey::new(owner_kind, source.namespace.as_str(), owner.name.as_str());
        let props = edges.add(source, target, RelationshipType::OwnedBy);
        if owner.controller == Some(true) {
            props.insert(CONTROLLER_PROPERTY.to_owned(), "true".to_owned());
        }
    }
}

fn scheduled_on(edges: &mut EdgeSet, source: &EntityKey, entity: &Entity) {
    let EntityBody::Pod(pod) = &entity.body else {
        return;
    };
    if pod.spec.node_name.is_empty() {
        return;
    }
    let target = EntityKey::cluster(EntityKind::Node, pod.spec.node_name.as_str());
    edges.add(source, target, RelationshipType::ScheduledOn);
}

fn mounts(edges: &mut EdgeSet, source: &EntityKey, entity: &Entity) {
    let EntityBody::Pod(pod) = &entity.body else {
        return;
    };
    for volume in &pod.spec.volumes {
        let Some(config_map) = volume.config_map.as_ref().filter(|cm| !cm.name.is_empty()) else {
            continue;
        };
        let target = EntityKey::new(
            EntityKind::ConfigMap,
            source.namespace.as_str(),
            config_map.name.as_str(),
        );
        let props = edges.add(source, target, RelationshipType::Mounts);
        append_listed(props, VOLUME_PROPERTY, &volume.name);
    }
}

fn selects(edges: &mut EdgeSet, source: &EntityKey, entity: &Entity, index: &LabelIndex) {
    let EntityBody::Service(service) = &entity.body else {
        return;
    };
    let Some(selector) = service.spec.selector.as_ref() else {
        return;
    };
    for pod in index.select(&source.namespace, selector) {
        edges.add(source, pod, RelationshipType::Selects);
    }
}

/// Append `value` to a comma-separated list property, skipping repeats.
fn append_listed(props: &mut Properties, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    match props.get_mut(key) {
        Some(existing) => {
            if !existing.split(',').any(|item| item == value) {
                existing.push(',');
                existing.push_str(value);
            }
        }
        None => {
            props.insert(key.to_owned(), value.to_owned());
        }
    }
}

// ---------------------------------------------------------------------------
// Edge collection
// ---------------------------------------------------------------------------

/// Relationships keyed by `(source, target, type)`.
#[derive(Debug, Default)]
struct EdgeSet {
    edges: BTreeMap<(EntityKey, EntityKey, RelationshipType), Properties>,
}

impl EdgeSet {
    /// Record an edge and return its property map for merging.
    fn add(
        &mut self,
        source: &EntityKey,
        target: EntityKey,
        relationship_type: RelationshipType,
    ) -> &mut Properties {
        self.edges
            .entry((source.clone(), target, relationship_type))
            .or_default()
    }

    fn into_relationships(self, revision: u64) -> Vec<GraphRelationship> {
        self.edges
            .into_iter()
            .map(
                |((source, target, relationship_type), properties)| GraphRelationship {
                    source,
                    target,
                    relationship_type,
                    properties: (!properties.is_empty()).then_some(properties),
                    revision,
                },
            )
            .collect()
    }
}
