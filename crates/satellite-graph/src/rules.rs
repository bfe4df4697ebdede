//! Per-kind derivation rules.
//!
//! Each supported kind has one [`KindRule`] row: how to flatten it into node
//! properties, and which relationships it originates. The builder never
//! branches on kinds directly; adding a kind means adding a row here.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use satellite_types::{
    ConfigMapBody, Entity, EntityBody, EntityKind, NodeBody, ObjectMeta, PodBody, ServiceBody,
    WorkloadBody,
};

/// Flat string properties of a graph node or relationship.
pub type Properties = BTreeMap<String, String>;

/// Extracts kind-specific properties from an entity body.
pub type PropertyFn = fn(&EntityBody, &mut Properties);

/// Derivation rules for one kind.
#[derive(Debug, Clone, Copy)]
pub struct KindRule {
    /// The kind these rules apply to.
    pub kind: EntityKind,
    /// Kind-specific property extraction.
    pub properties: PropertyFn,
    /// Owner kinds that produce `OWNED_BY` edges; others are ignored.
    pub owner_kinds: &'static [EntityKind],
    /// Whether `spec.nodeName` produces a `SCHEDULED_ON` edge.
    pub schedules_on: bool,
    /// Whether config-map volumes produce `MOUNTS` edges.
    pub mounts: bool,
    /// Whether the label selector produces `SELECTS` edges.
    pub selects: bool,
}

const POD: KindRule = KindRule {
    kind: EntityKind::Pod,
    properties: pod_properties,
    owner_kinds: &[EntityKind::ReplicaSet, EntityKind::Deployment],
    schedules_on: true,
    mounts: true,
    selects: false,
};

const REPLICA_SET: KindRule = KindRule {
    kind: EntityKind::ReplicaSet,
    properties: workload_properties,
    owner_kinds: &[EntityKind::Deployment],
    schedules_on: false,
    mounts: false,
    selects: false,
};

const DEPLOYMENT: KindRule = KindRule {
    kind: EntityKind::Deployment,
    properties: workload_properties,
    owner_kinds: &[],
    schedules_on: false,
    mounts: false,
    selects: false,
};

const NODE: KindRule = KindRule {
    kind: EntityKind::Node,
    properties: node_properties,
    owner_kinds: &[],
    schedules_on: false,
    mounts: false,
    selects: false,
};

const SERVICE: KindRule = KindRule {
    kind: EntityKind::Service,
    properties: service_properties,
    owner_kinds: &[],
    schedules_on: false,
    mounts: false,
    selects: true,
};

const CONFIG_MAP: KindRule = KindRule {
    kind: EntityKind::ConfigMap,
    properties: config_map_properties,
    owner_kinds: &[],
    schedules_on: false,
    mounts: false,
    selects: false,
};

/// One row per supported kind, in [`EntityKind::ALL`] order.
pub const RULES: [KindRule; 6] = [POD, REPLICA_SET, DEPLOYMENT, NODE, SERVICE, CONFIG_MAP];

/// Return the rule row for `kind`.
pub const fn rule(kind: EntityKind) -> &'static KindRule {
    match kind {
        EntityKind::Pod => &POD,
        EntityKind::ReplicaSet => &REPLICA_SET,
        EntityKind::Deployment => &DEPLOYMENT,
        EntityKind::Node => &NODE,
        EntityKind::Service => &SERVICE,
        EntityKind::ConfigMap => &CONFIG_MAP,
    }
}

/// Build the full property map of a node: common metadata plus the
/// kind-specific fields from its rule.
pub fn node_properties_for(entity: &Entity, rule: &KindRule) -> Properties {
    let mut props = common_properties(&entity.metadata);
    (rule.properties)(&entity.body, &mut props);
    props
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Join a string map as sorted `k=v` pairs separated by commas.
pub fn join_pairs(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn format_time(time: Option<&DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn set(props: &mut Properties, key: &str, value: impl Into<String>) {
    props.insert(key.to_owned(), value.into());
}

// ---------------------------------------------------------------------------
// Property extraction
// ---------------------------------------------------------------------------

fn common_properties(meta: &ObjectMeta) -> Properties {
    let mut props = Properties::new();
    set(&mut props, "uid", meta.uid.as_str());
    set(&mut props, "resourceVersion", meta.resource_version.as_str());
    set(
        &mut props,
        "creationTimestamp",
        format_time(meta.creation_timestamp.as_ref()),
    );
    if !meta.labels.is_empty() {
        set(&mut props, "labels", join_pairs(&meta.labels));
    }
    if !meta.annotations.is_empty() {
        set(&mut props, "annotations", join_pairs(&meta.annotations));
    }
    props
}

fn pod_properties(body: &EntityBody, props: &mut Properties) {
    let EntityBody::Pod(PodBody { spec, status }) = body else {
        return;
    };
    set(props, "status.phase", status.phase.as_str());
    set(props, "spec.nodeName", spec.node_name.as_str());
    set(props, "status.podIP", status.pod_ip.as_str());
    set(props, "status.hostIP", status.host_ip.as_str());
    set(props, "status.startTime", format_time(status.start_time.as_ref()));
}

fn workload_properties(body: &EntityBody, props: &mut Properties) {
    let (WorkloadBody { spec, status }, is_deployment) = match body {
        EntityBody::ReplicaSet(workload) => (workload, false),
        EntityBody::Deployment(workload) => (workload, true),
        _ => return,
    };
    set(
        props,
        "spec.replicas",
        spec.replicas.map(|r| r.to_string()).unwrap_or_default(),
    );
    set(props, "status.replicas", status.replicas.to_string());
    set(props, "status.readyReplicas", status.ready_replicas.to_string());
    set(
        props,
        "status.availableReplicas",
        status.available_replicas.to_string(),
    );
    if is_deployment {
        set(
            props,
            "status.updatedReplicas",
            status.updated_replicas.to_string(),
        );
    }
    set(
        props,
        "spec.selector",
        spec.selector
            .as_ref()
            .map(|s| join_pairs(&s.match_labels))
            .unwrap_or_default(),
    );
}

fn node_properties(body: &EntityBody, props: &mut Properties) {
    let EntityBody::Node(NodeBody { spec, status }) = body else {
        return;
    };
    let quantity = |map: &BTreeMap<String, String>, resource: &str| {
        map.get(resource).cloned().unwrap_or_else(|| "0".to_owned())
    };
    set(props, "spec.podCIDR", spec.pod_cidr.as_str());
    set(props, "status.capacity.cpu", quantity(&status.capacity, "cpu"));
    set(
        props,
        "status.capacity.memory",
        quantity(&status.capacity, "memory"),
    );
    set(
        props,
        "status.allocatable.cpu",
        quantity(&status.allocatable, "cpu"),
    );
    set(
        props,
        "status.allocatable.memory",
        quantity(&status.allocatable, "memory"),
    );
    let info = &status.node_info;
    set(
        props,
        "status.nodeInfo.kubeletVersion",
        info.kubelet_version.as_str(),
    );
    set(props, "status.nodeInfo.osImage", info.os_image.as_str());
    set(
        props,
        "status.nodeInfo.containerRuntimeVersion",
        info.container_runtime_version.as_str(),
    );
}

fn service_properties(body: &EntityBody, props: &mut Properties) {
    let EntityBody::Service(ServiceBody { spec }) = body else {
        return;
    };
    set(props, "spec.type", spec.service_type.as_str());
    set(props, "spec.clusterIP", spec.cluster_ip.as_str());
    if !spec.cluster_ips.is_empty() {
        set(props, "spec.clusterIPs", spec.cluster_ips.join(","));
    }
    if let Some(selector) = &spec.selector {
        set(props, "spec.selector", join_pairs(selector));
    }
}

fn config_map_properties(body: &EntityBody, props: &mut Properties) {
    let EntityBody::ConfigMap(ConfigMapBody { data }) = body else {
        return;
    };
    if !data.is_empty() {
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        set(props, "data.keys", keys.join(","));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props_of(object: &serde_json::Value) -> Properties {
        let entity = Entity::from_json(object, None).unwrap();
        node_properties_for(&entity, rule(entity.kind().unwrap()))
    }

    #[test]
    fn table_is_in_kind_order() {
        for (row, kind) in RULES.iter().zip(EntityKind::ALL) {
            assert_eq!(row.kind, kind);
            assert_eq!(rule(kind).kind, kind);
        }
    }

    #[test]
    fn ownership_rules() {
        assert_eq!(
            rule(EntityKind::Pod).owner_kinds,
            &[EntityKind::ReplicaSet, EntityKind::Deployment]
        );
        assert_eq!(rule(EntityKind::ReplicaSet).owner_kinds, &[EntityKind::Deployment]);
        assert!(rule(EntityKind::Deployment).owner_kinds.is_empty());
    }

    #[test]
    fn common_properties_format() {
        let props = props_of(&json!({
            "kind": "ConfigMap",
            "metadata": {
                "name": "settings",
                "namespace": "shop",
                "uid": "cm-uid",
                "resourceVersion": "9",
                "creationTimestamp": "2024-05-01T10:00:00Z",
                "labels": {"tier": "web", "app": "shop"},
                "annotations": {"owner": "team-a"}
            },
            "data": {"b.yaml": "", "a.yaml": ""}
        }));
        assert_eq!(props["uid"], "cm-uid");
        assert_eq!(props["resourceVersion"], "9");
        assert_eq!(props["creationTimestamp"], "2024-05-01T10:00:00Z");
        assert_eq!(props["labels"], "app=shop,tier=web");
        assert_eq!(props["annotations"], "owner=team-a");
        assert_eq!(props["data.keys"], "a.yaml,b.yaml");
    }

    #[test]
    fn empty_maps_are_omitted() {
        let props = props_of(&json!({"kind": "ConfigMap", "metadata": {"name": "empty"}}));
        assert!(!props.contains_key("labels"));
        assert!(!props.contains_key("annotations"));
        assert!(!props.contains_key("data.keys"));
        assert_eq!(props["creationTimestamp"], "");
    }

    #[test]
    fn pod_extracted() {
        let props = props_of(&json!({
            "kind": "Pod",
            "metadata": {"name": "web-0", "namespace": "shop"},
            "spec": {"nodeName": "worker-1"},
            "status": {"phase": "Running", "podIP": "10.0.0.7", "hostIP": "192.168.1.4",
                       "startTime": "2024-05-01T10:00:03Z"}
        }));
        assert_eq!(props["status.phase"], "Running");
        assert_eq!(props["spec.nodeName"], "worker-1");
        assert_eq!(props["status.podIP"], "10.0.0.7");
        assert_eq!(props["status.hostIP"], "192.168.1.4");
        assert_eq!(props["status.startTime"], "2024-05-01T10:00:03Z");
    }

    #[test]
    fn workload_extracted() {
        let rs = props_of(&json!({
            "kind": "ReplicaSet",
            "metadata": {"name": "web-7d9", "namespace": "shop"},
            "spec": {"replicas": 3, "selector": {"matchLabels": {"app": "web"}}},
            "status": {"replicas": 3, "readyReplicas": 2, "availableReplicas": 2}
        }));
        assert_eq!(rs["spec.replicas"], "3");
        assert_eq!(rs["status.readyReplicas"], "2");
        assert_eq!(rs["spec.selector"], "app=web");
        assert!(!rs.contains_key("status.updatedReplicas"));

        let deploy = props_of(&json!({
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "shop"},
            "status": {"updatedReplicas": 1}
        }));
        assert_eq!(deploy["spec.replicas"], "");
        assert_eq!(deploy["spec.selector"], "");
        assert_eq!(deploy["status.updatedReplicas"], "1");
    }

    #[test]
    fn node_quantities_default_to_zero() {
        let props = props_of(&json!({
            "kind": "Node",
            "metadata": {"name": "worker-1"},
            "spec": {"podCIDR": "10.244.0.0/24"},
            "status": {
                "capacity": {"cpu": "4"},
                "nodeInfo": {"kubeletVersion": "v1.30.1", "osImage": "Debian 12"}
            }
        }));
        assert_eq!(props["spec.podCIDR"], "10.244.0.0/24");
        assert_eq!(props["status.capacity.cpu"], "4");
        assert_eq!(props["status.capacity.memory"], "0");
        assert_eq!(props["status.allocatable.cpu"], "0");
        assert_eq!(props["status.nodeInfo.osImage"], "Debian 12");
        assert_eq!(props["status.nodeInfo.containerRuntimeVersion"], "");
    }

    #[test]
    fn service_extracted() {
        let props = props_of(&json!({
            "kind": "Service",
            "metadata": {"name": "web", "namespace": "shop"},
            "spec": {"type": "ClusterIP", "clusterIP": "10.96.0.10",
                     "clusterIPs": ["10.96.0.10", "fd00::a"], "selector": {"app": "web"}}
        }));
        assert_eq!(props["spec.type"], "ClusterIP");
        assert_eq!(props["spec.clusterIPs"], "10.96.0.10,fd00::a");
        assert_eq!(props["spec.selector"], "app=web");

        let headless = props_of(&json!({"kind": "Service", "metadata": {"name": "ext"}}));
        assert!(!headless.contains_key("spec.selector"));
        assert!(!headless.contains_key("spec.clusterIPs"));
    }
}
