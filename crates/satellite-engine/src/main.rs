//! Satellite engine binary.
//!
//! This is the main entry point that wires the watch sources, the entity
//! store, the orchestrator, and the snapshot emitter together. It loads
//! configuration, starts one reader per watch source, and runs the
//! build-and-emit loop until a signal arrives or (when configured) every
//! source has ended. A final snapshot is always written on the way out.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `satellite-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the entity store and shutdown control
//! 4. Open every watch source (any failure is fatal)
//! 5. Start the source readers and the end-of-stream supervisor
//! 6. Install signal handlers
//! 7. Run the orchestrator
//! 8. Log the result

mod error;
mod watch;

use std::path::Path;
use std::sync::Arc;

use satellite_core::config::LoggingConfig;
use satellite_core::{LogFormat, Orchestrator, SatelliteConfig, Shutdown, ShutdownReason};
use satellite_store::{EntityStore, SnapshotEmitter};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::watch::{Source, SourceEnded};

/// Application entry point for the Satellite engine.
///
/// # Errors
///
/// Returns an error if configuration, logging, or a watch source cannot be
/// set up, or if the orchestrator stops with an error.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so remember whether the
    //    file was found and report it below.
    let config_path = SatelliteConfig::path_from_env();
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("satellite-engine starting");
    if !found {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        output_dir = %config.output.dir.display(),
        sources = config.watch.sources.len(),
        exit_when_sources_end = config.watch.exit_when_sources_end,
        "Configuration loaded"
    );

    // 3. Create the store and shutdown control.
    let store = Arc::new(EntityStore::new());
    let shutdown = Arc::new(Shutdown::new());

    // 4. Open every watch source before anything starts reading.
    let mut sources = Vec::with_capacity(config.watch.sources.len());
    for source in &config.watch.sources {
        let opened = Source::open(source, &store).map_err(|e| EngineError::Source {
            path: source.path.clone(),
            source: e,
        })?;
        sources.push(opened);
    }
    if sources.is_empty() {
        warn!("No watch sources configured, snapshots will be empty");
    }

    // 5. Start readers and the end-of-stream supervisor.
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let source_count = sources.len();
    for source in sources {
        let path = source.path().to_path_buf();
        source
            .spawn(done_tx.clone())
            .map_err(|e| EngineError::Source { path, source: e })?;
    }
    drop(done_tx);
    tokio::spawn(supervise_sources(
        done_rx,
        source_count,
        config.watch.exit_when_sources_end,
        Arc::clone(&shutdown),
    ));
    info!(sources = source_count, "Watch sources started");

    // 6. Install signal handlers.
    tokio::spawn(wait_for_signal(Arc::clone(&shutdown)));

    // 7. Run the orchestrator.
    let emitter = SnapshotEmitter::new(config.output.dir);
    let summary = Orchestrator::new(store, emitter, shutdown)
        .run()
        .await
        .map_err(EngineError::from)?;

    // 8. Log results.
    info!(
        reason = ?summary.reason,
        cycles = summary.cycles,
        emitted = summary.emitted,
        failed = summary.failed,
        last_snapshot = ?summary.last.and_then(|report| report.path),
        "satellite-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `path`, falling back to defaults (with
/// environment overrides) when the file does not exist.
///
/// Returns the configuration and whether the file was found.
fn load_config(path: &Path) -> Result<(SatelliteConfig, bool), EngineError> {
    if path.exists() {
        let config = SatelliteConfig::from_file(path)?;
        Ok((config, true))
    } else {
        let mut config = SatelliteConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| EngineError::Logging {
        message: format!("{e}"),
    })
}

/// Collect end-of-stream reports. Once every source has ended, request
/// shutdown if `exit_when_done` is set.
async fn supervise_sources(
    mut done: mpsc::UnboundedReceiver<SourceEnded>,
    expected: usize,
    exit_when_done: bool,
    shutdown: Arc<Shutdown>,
) {
    let mut ended: usize = 0;
    while let Some(report) = done.recv().await {
        ended = ended.saturating_add(1);
        info!(
            path = %report.path.display(),
            applied = report.stats.applied,
            skipped = report.stats.skipped,
            ended,
            expected,
            "Watch source ended"
        );
    }

    if ended < expected {
        warn!(ended, expected, "Some sources stopped without reporting");
    }
    if exit_when_done {
        info!("All watch sources ended");
        shutdown.request(ShutdownReason::SourcesEnded);
    }
}

/// Wait for Ctrl-C (or SIGTERM on Unix) and request shutdown.
async fn wait_for_signal(shutdown: Arc<Shutdown>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!(error = %e, "Failed to listen for Ctrl-C");
                            return;
                        }
                    }
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    return;
                }
            }
        }
    }

    #[cfg(not(unix))]
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }

    info!("Received shutdown signal");
    shutdown.request(ShutdownReason::Signal);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::watch::SourceStats;

    use super::*;

    fn ended(path: &str) -> SourceEnded {
        SourceEnded {
            path: PathBuf::from(path),
            stats: SourceStats::default(),
        }
    }

    #[tokio::test]
    async fn all_sources_ended_requests_shutdown() {
        let shutdown = Arc::new(Shutdown::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = tokio::spawn(supervise_sources(rx, 2, true, Arc::clone(&shutdown)));

        tx.send(ended("pods.json")).unwrap();
        tx.send(ended("nodes.json")).unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), supervisor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shutdown.reason(), Some(ShutdownReason::SourcesEnded));
    }

    #[tokio::test]
    async fn sources_ending_is_ignored_unless_configured() {
        let shutdown = Arc::new(Shutdown::new());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ended("-")).unwrap();
        drop(tx);

        supervise_sources(rx, 1, false, Arc::clone(&shutdown)).await;
        assert!(!shutdown.is_requested());
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, found) = load_config(&dir.path().join("absent.yaml")).unwrap();
        assert!(!found);
        assert!(config.watch.sources.is_empty());
    }
}
