//! Integration tests for the `satellite-store` state and output layer.
//!
//! These exercise the store, its change signal, and the snapshot emitter
//! together, the way the orchestrator drives them: several writers feed
//! the store concurrently while one consumer drains the signal and writes
//! snapshots into a scratch directory.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use satellite_store::{EntityStore, SnapshotEmitter, SnapshotSink};
use satellite_types::{DeleteInput, Entity, EntityKey, EntityKind, Graph, GraphNode};
use serde_json::json;

fn entity(kind: &str, namespace: &str, name: &str) -> Entity {
    Entity::from_json(
        &json!({"kind": kind, "metadata": {"name": name, "namespace": namespace}}),
        None,
    )
    .unwrap()
}

/// Minimal stand-in for the graph builder: one node per stored entity.
fn nodes_only(store: &EntityStore, revision: u64) -> Graph {
    let mut nodes: Vec<GraphNode> = store
        .list()
        .iter()
        .filter_map(Entity::key)
        .map(|key| GraphNode {
            key,
            properties: BTreeMap::new(),
            revision,
        })
        .collect();
    nodes.sort_by(|a, b| a.key.cmp(&b.key));
    Graph {
        nodes,
        relationships: Vec::new(),
        revision,
    }
}

#[tokio::test]
async fn concurrent_sources_then_single_snapshot() {
    let store = Arc::new(EntityStore::new());

    let pods = store.handler(EntityKind::Pod);
    let nodes = store.handler(EntityKind::Node);
    let pod_task = tokio::task::spawn_blocking(move || {
        for i in 0..20 {
            pods.on_add(entity("Pod", "shop", &format!("web-{i}")));
        }
        pods.on_delete(DeleteInput::from(EntityKey::new(EntityKind::Pod, "shop", "web-0")));
    });
    let node_task = tokio::task::spawn_blocking(move || {
        for i in 0..3 {
            nodes.on_add(entity("Node", "", &format!("worker-{i}")));
        }
    });
    pod_task.await.unwrap();
    node_task.await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), store.changes().wait())
        .await
        .unwrap();
    assert!(!store.changes().is_pending());

    let dir = tempfile::tempdir().unwrap();
    let emitter = SnapshotEmitter::new(dir.path());
    let path = emitter.write(&nodes_only(&store, 1)).unwrap();

    let document: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    assert_eq!(document["graphRevision"], 1);
    assert_eq!(document["nodes"].as_array().unwrap().len(), 22);
    assert!(document["relationships"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn consumer_sees_changes_made_while_it_was_busy() {
    let store = Arc::new(EntityStore::new());
    store.upsert(entity("ConfigMap", "shop", "settings"));

    // First drain.
    store.changes().wait().await;
    let first = nodes_only(&store, 1);

    // Mutations during the "build" must leave a fresh pending signal.
    store.upsert(entity("ConfigMap", "shop", "extra"));
    store.delete(DeleteInput::from(EntityKey::new(
        EntityKind::ConfigMap,
        "shop",
        "settings",
    )));

    tokio::time::timeout(Duration::from_secs(1), store.changes().wait())
        .await
        .unwrap();
    let second = nodes_only(&store, 2);

    assert_eq!(first.nodes.len(), 1);
    assert_eq!(second.nodes.len(), 1);
    assert_eq!(second.nodes[0].key.name, "extra");
}
