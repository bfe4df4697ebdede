//! Single-slot coalescing change signal.
//!
//! Writers call [`ChangeSignal::notify`] after every successful mutation.
//! However many notifications arrive between two drains, the consumer sees
//! exactly one pending signal. Notifying never blocks and never fails.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Coalescing "something changed" signal shared by a store and its consumer.
///
/// Built from a dirty flag and a [`Notify`]. The flag is the source of
/// truth; the `Notify` only wakes a parked waiter on the clean to dirty
/// transition.
#[derive(Debug, Default)]
pub struct ChangeSignal {
    /// Set while a change is pending and not yet drained.
    dirty: AtomicBool,
    /// Wakes the consumer parked in [`ChangeSignal::wait`].
    wake: Notify,
}

impl ChangeSignal {
    /// Create a signal with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a change as pending.
    ///
    /// Only the first notification after a drain wakes the consumer; later
    /// ones are absorbed into the already-pending signal.
    pub fn notify(&self) {
        if !self.dirty.swap(true, Ordering::AcqRel) {
            self.wake.notify_one();
        }
    }

    /// Drain the pending signal without waiting. Returns whether one was
    /// pending.
    pub fn try_take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Whether a change is pending.
    pub fn is_pending(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Wait until a change is pending, then drain it.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves any
    /// pending signal in place.
    pub async fn wait(&self) {
        loop {
            if self.try_take() {
                return;
            }
            self.wake.notified().await;
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
    fn starts_clean() {
        let signal = ChangeSignal::new();
        assert!(!signal.is_pending());
        assert!(!signal.try_take());
    }

    #[test]
    fn burst_coalesces_into_one_signal() {
        let signal = ChangeSignal::new();
        for _ in 0..100 {
            signal.notify();
        }
        assert!(signal.is_pending());
        assert!(signal.try_take());
        assert!(!signal.try_take());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_pending() {
        let signal = ChangeSignal::new();
        signal.notify();
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .unwrap();
        assert!(!signal.is_pending());
    }

    #[tokio::test]
    async fn wait_wakes_on_notify_from_another_task() {
        let signal = Arc::new(ChangeSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::task::yield_now().await;
        signal.notify();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(!signal.is_pending());
    }

    #[tokio::test]
    async fn wait_blocks_after_drain() {
        let signal = ChangeSignal::new();
        signal.notify();
        assert!(signal.try_take());

        // The stale wake-up permit must not be mistaken for a change.
        let outcome = tokio::time::timeout(Duration::from_millis(50), signal.wait()).await;
        assert!(outcome.is_err());
    }
}
