//! The build-and-emit loop.
//!
//! [`Orchestrator::run`] waits on two things: the store's change signal and
//! the shutdown control. Each change starts one cycle:
//!
//! 1. take the next revision,
//! 2. snapshot the store,
//! 3. build the graph,
//! 4. hand it to the snapshot sink.
//!
//! A failed emit is logged and the loop keeps going; the next change gets
//! a fresh revision. When shutdown is requested the loop stops waiting and
//! runs exactly one final cycle, so the last state observed is always on
//! disk. Shutdown never interrupts a cycle already in progress.

use std::path::PathBuf;
use std::sync::Arc;

use satellite_graph::GraphBuilder;
use satellite_store::{EntityStore, SnapshotSink};
use tracing::{error, info};

use crate::revision::{RevisionCounter, RevisionError};
use crate::shutdown::{Shutdown, ShutdownReason};

/// Errors that stop the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// No further revision can be handed out.
    #[error("revision error: {source}")]
    Revision {
        /// The underlying revision error.
        #[from]
        source: RevisionError,
    },
}

/// Outcome of a single build-and-emit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Revision stamped on the graph.
    pub revision: u64,
    /// Number of nodes built.
    pub nodes: usize,
    /// Number of relationships built.
    pub relationships: usize,
    /// Where the snapshot was written; `None` if the emit failed.
    pub path: Option<PathBuf>,
}

/// Result of a complete orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Why the run ended.
    pub reason: Option<ShutdownReason>,
    /// Cycles executed, including the final one.
    pub cycles: u64,
    /// Cycles whose snapshot was written.
    pub emitted: u64,
    /// Cycles whose emit failed.
    pub failed: u64,
    /// Report of the final cycle.
    pub last: Option<CycleReport>,
}

impl RunSummary {
    fn record(&mut self, report: CycleReport) {
        self.cycles = self.cycles.saturating_add(1);
        if report.path.is_some() {
            self.emitted = self.emitted.saturating_add(1);
        } else {
            self.failed = self.failed.saturating_add(1);
        }
        self.last = Some(report);
    }
}

/// Drives graph builds from store changes into a snapshot sink.
#[derive(Debug)]
pub struct Orchestrator<S> {
    /// Source of entity snapshots and change notifications.
    store: Arc<EntityStore>,
    /// Destination of built graphs.
    sink: S,
    /// Stop control.
    shutdown: Arc<Shutdown>,
    /// Revision source; owned exclusively by this loop.
    revisions: RevisionCounter,
}

impl<S: SnapshotSink> Orchestrator<S> {
    /// Create an orchestrator starting from revision 1.
    pub const fn new(store: Arc<EntityStore>, sink: S, shutdown: Arc<Shutdown>) -> Self {
        Self {
            store,
            sink,
            shutdown,
            revisions: RevisionCounter::new(),
        }
    }

    /// Replace the revision counter.
    #[must_use]
    pub fn with_revisions(mut self, revisions: RevisionCounter) -> Self {
        self.revisions = revisions;
        self
    }

    /// Last revision handed out, or 0 before the first cycle.
    pub const fn revision(&self) -> u64 {
        self.revisions.current()
    }

    /// Run one build-and-emit cycle against the current store contents.
    ///
    /// An emit failure is logged and reported through
    /// [`CycleReport::path`]; it does not fail the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Revision`] if the revision counter is
    /// exhausted.
    pub fn run_cycle(&mut self) -> Result<CycleReport, OrchestratorError> {
        let revision = self.revisions.advance()?;
        let snapshot = self.store.list();
        let graph = GraphBuilder::build(&snapshot, revision);

        let path = match self.sink.write(&graph) {
            Ok(path) => Some(path),
            Err(err) => {
                error!(revision, error = %err, "Snapshot emit failed");
                None
            }
        };

        Ok(CycleReport {
            revision,
            nodes: graph.nodes.len(),
            relationships: graph.relationships.len(),
            path,
        })
    }

    /// Run until shutdown is requested, then run one final cycle.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if a cycle cannot be started.
    pub async fn run(mut self) -> Result<RunSummary, OrchestratorError> {
        let mut summary = RunSummary::default();
        let store = Arc::clone(&self.store);
        let shutdown = Arc::clone(&self.shutdown);

        info!(entities = store.len(), "Orchestrator starting");

        loop {
            tokio::select! {
                biased;
                () = shutdown.wait() => break,
                () = store.changes().wait() => {
                    let report = self.run_cycle()?;
                    summary.record(report);
                }
            }
        }

        summary.reason = shutdown.reason();
        info!(reason = ?summary.reason, "Shutdown requested, running final cycle");
        let report = self.run_cycle()?;
        summary.record(report);

        info!(
            cycles = summary.cycles,
            emitted = summary.emitted,
            failed = summary.failed,
            last_revision = self.revision(),
            "Orchestrator stopped"
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    use satellite_store::SnapshotError;
    use satellite_types::{Entity, Graph};
    use serde_json::json;

    use super::*;

    /// Records every graph; fails the writes whose 1-based position is
    /// listed in `fail_on`.
    #[derive(Default)]
    struct RecordingSink {
        graphs: Mutex<Vec<Graph>>,
        fail_on: Vec<usize>,
    }

    impl RecordingSink {
        fn failing_on(fail_on: Vec<usize>) -> Self {
            Self {
                graphs: Mutex::default(),
                fail_on,
            }
        }

        fn revisions(&self) -> Vec<u64> {
            self.graphs.lock().unwrap().iter().map(|g| g.revision).collect()
        }

        fn count(&self) -> usize {
            self.graphs.lock().unwrap().len()
        }
    }

    impl SnapshotSink for RecordingSink {
        fn write(&self, graph: &Graph) -> Result<PathBuf, SnapshotError> {
            let mut graphs = self.graphs.lock().unwrap();
            graphs.push(graph.clone());
            if self.fail_on.contains(&graphs.len()) {
                return Err(SnapshotError::Sync {
                    path: PathBuf::from("graph-test.json.tmp"),
                    source: io::Error::other("injected"),
                });
            }
            Ok(PathBuf::from(format!("graph-{}.json", graph.revision)))
        }
    }

    fn pod(name: &str) -> Entity {
        Entity::from_json(
            &json!({"kind": "Pod", "metadata": {"name": name, "namespace": "shop"}}),
            None,
        )
        .unwrap()
    }

    async fn wait_for_writes(sink: &RecordingSink, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while sink.count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn run_cycle_stamps_increasing_revisions() {
        let store = Arc::new(EntityStore::new());
        let sink = Arc::new(RecordingSink::default());
        let mut orchestrator =
            Orchestrator::new(Arc::clone(&store), Arc::clone(&sink), Arc::new(Shutdown::new()));

        store.upsert(pod("web-0"));
        let first = orchestrator.run_cycle().unwrap();
        let second = orchestrator.run_cycle().unwrap();

        assert_eq!(first.revision, 1);
        assert_eq!(second.revision, 2);
        assert_eq!(first.nodes, 1);
        assert_eq!(sink.revisions(), vec![1, 2]);
    }

    #[tokio::test]
    async fn shutdown_without_changes_still_emits_once() {
        let store = Arc::new(EntityStore::new());
        let sink = Arc::new(RecordingSink::default());
        let shutdown = Arc::new(Shutdown::new());
        shutdown.request(ShutdownReason::Requested);

        let summary = Orchestrator::new(store, Arc::clone(&sink), shutdown)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.reason, Some(ShutdownReason::Requested));
        assert_eq!(sink.revisions(), vec![1]);
    }

    #[tokio::test]
    async fn change_then_shutdown_emits_final_snapshot() {
        let store = Arc::new(EntityStore::new());
        let sink = Arc::new(RecordingSink::default());
        let shutdown = Arc::new(Shutdown::new());
        let task = tokio::spawn(
            Orchestrator::new(Arc::clone(&store), Arc::clone(&sink), Arc::clone(&shutdown)).run(),
        );

        store.upsert(pod("web-0"));
        wait_for_writes(&sink, 1).await;

        store.upsert(pod("web-1"));
        shutdown.request(ShutdownReason::Signal);
        let summary = task.await.unwrap().unwrap();

        // The final cycle sees everything upserted before shutdown.
        let graphs = sink.graphs.lock().unwrap();
        let last = graphs.last().unwrap();
        assert_eq!(last.nodes.len(), 2);
        assert_eq!(summary.last.unwrap().revision, last.revision);
        assert_eq!(summary.reason, Some(ShutdownReason::Signal));
    }

    #[tokio::test]
    async fn emit_failure_does_not_stop_the_loop() {
        let store = Arc::new(EntityStore::new());
        let sink = Arc::new(RecordingSink::failing_on(vec![1]));
        let shutdown = Arc::new(Shutdown::new());
        let task = tokio::spawn(
            Orchestrator::new(Arc::clone(&store), Arc::clone(&sink), Arc::clone(&shutdown)).run(),
        );

        store.upsert(pod("web-0"));
        wait_for_writes(&sink, 1).await;
        store.upsert(pod("web-1"));
        wait_for_writes(&sink, 2).await;

        shutdown.request(ShutdownReason::Requested);
        let summary = task.await.unwrap().unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.emitted, summary.cycles - 1);
        let revisions = sink.revisions();
        assert!(revisions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn revision_exhaustion_stops_the_run() {
        let store = Arc::new(EntityStore::new());
        let sink = Arc::new(RecordingSink::default());
        let shutdown = Arc::new(Shutdown::new());
        shutdown.request(ShutdownReason::Requested);

        let result = Orchestrator::new(store, Arc::clone(&sink), shutdown)
            .with_revisions(RevisionCounter::starting_at(u64::MAX))
            .run()
            .await;

        assert!(matches!(result, Err(OrchestratorError::Revision { .. })));
        assert_eq!(sink.count(), 0);
    }
}
