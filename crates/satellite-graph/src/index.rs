//! Label index for selector evaluation.
//!
//! Pods are indexed by namespace, then label key, then label value. A
//! selector is evaluated by intersecting the pod sets of each of its pairs
//! inside a single namespace, so a service can never match a pod in another
//! namespace.

use std::collections::{BTreeMap, BTreeSet};

use satellite_types::EntityKey;

/// Label key → label value → pods carrying that pair.
type LabelMap = BTreeMap<String, BTreeMap<String, BTreeSet<EntityKey>>>;

/// Pods of every namespace, indexed by their labels.
#[derive(Debug, Default)]
pub struct LabelIndex {
    /// Namespace → label map.
    namespaces: BTreeMap<String, LabelMap>,
}

impl LabelIndex {
    /// Create an empty index.
    pub const fn new() -> Self {
        Self {
            namespaces: BTreeMap::new(),
        }
    }

    /// Index one pod under each of its labels.
    pub fn insert(&mut self, key: &EntityKey, labels: &BTreeMap<String, String>) {
        let by_label = self.namespaces.entry(key.namespace.clone()).or_default();
        for (label, value) in labels {
            by_label
                .entry(label.clone())
                .or_default()
                .entry(value.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    /// Return every pod in `namespace` whose labels contain all pairs of
    /// `selector`. An empty selector matches nothing.
    pub fn select(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> BTreeSet<EntityKey> {
        let Some(by_label) = self.namespaces.get(namespace) else {
            return BTreeSet::new();
        };

        let mut matched: Option<BTreeSet<EntityKey>> = None;
        for (label, value) in selector {
            let Some(pods) = by_label.get(label).and_then(|values| values.get(value)) else {
                return BTreeSet::new();
            };
            let narrowed = match matched {
                None => pods.clone(),
                Some(previous) => previous.intersection(pods).cloned().collect(),
            };
            if narrowed.is_empty() {
                return narrowed;
            }
            matched = Some(narrowed);
        }
        matched.unwrap_or_default()
    }
}
