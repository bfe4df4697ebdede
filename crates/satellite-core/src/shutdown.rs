//! Shutdown control shared by the orchestrator and its callers.
//!
//! Anyone holding the [`Shutdown`] (signal handlers, watch sources, tests)
//! can request a stop. The orchestrator observes the request between cycles;
//! an in-flight build and emit always run to completion first.

use std::pin::pin;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Why shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The process received an interrupt or terminate signal.
    Signal,
    /// Every watch source reached end of stream.
    SourcesEnded,
    /// A caller requested the stop programmatically.
    Requested,
}

/// Shared shutdown state.
///
/// Wrapped in [`Arc`](std::sync::Arc) and shared between the orchestrator
/// and whatever may ask it to stop. The first requested reason is kept.
#[derive(Debug, Default)]
pub struct Shutdown {
    /// Whether shutdown has been requested.
    requested: AtomicBool,

    /// Reason given by the first request.
    reason: OnceLock<ShutdownReason>,

    /// Wakes every task parked in [`Shutdown::wait`].
    notify: Notify,
}

impl Shutdown {
    /// Create a shutdown control with no request pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Later requests keep the first reason.
    pub fn request(&self, reason: ShutdownReason) {
        let _ = self.reason.set(reason);
        self.requested.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Check whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Reason given by the first request, if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Wait until shutdown is requested.
    ///
    /// Returns immediately if it already has been.
    pub async fn wait(&self) {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn starts_unrequested() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_requested());
        assert_eq!(shutdown.reason(), None);
    }

    #[test]
    fn first_reason_wins() {
        let shutdown = Shutdown::new();
        shutdown.request(ShutdownReason::SourcesEnded);
        shutdown.request(ShutdownReason::Signal);
        assert!(shutdown.is_requested());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::SourcesEnded));
    }

    #[tokio::test]
    async fn wait_returns_when_already_requested() {
        let shutdown = Shutdown::new();
        shutdown.request(ShutdownReason::Requested);
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wait_wakes_every_waiter() {
        let shutdown = Arc::new(Shutdown::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move { shutdown.wait().await })
            })
            .collect();

        tokio::task::yield_now().await;
        shutdown.request(ShutdownReason::Signal);

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
