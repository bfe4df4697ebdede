//! Graph revision counter.
//!
//! Every build gets a fresh revision, strictly greater than every revision
//! handed out before it in this process. The counter is owned by the
//! orchestrator and advanced with checked arithmetic; it never wraps.

/// Errors that can occur while advancing the revision counter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevisionError {
    /// The counter would overflow.
    #[error("revision counter overflow: cannot advance beyond u64::MAX")]
    Overflow,
}

/// Monotonic source of graph revisions.
///
/// The first revision handed out is 1; revision 0 means "nothing built yet".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionCounter {
    /// Last revision handed out.
    current: u64,
}

impl RevisionCounter {
    /// Create a counter that has handed out no revisions.
    pub const fn new() -> Self {
        Self { current: 0 }
    }

    /// Create a counter that resumes after `current` (useful for testing).
    pub const fn starting_at(current: u64) -> Self {
        Self { current }
    }

    /// Last revision handed out, or 0 if none.
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Hand out the next revision.
    ///
    /// # Errors
    ///
    /// Returns [`RevisionError::Overflow`] if the counter is at `u64::MAX`.
    pub const fn advance(&mut self) -> Result<u64, RevisionError> {
        match self.current.checked_add(1) {
            Some(next) => {
                self.current = next;
                Ok(next)
            }
            None => Err(RevisionError::Overflow),
        }
    }
}
