use std::fmt;
use std::time::Duration;

/// Why a bounded wait gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The stuck-command limit expired.
    TimedOut(Duration),
    /// The wait was interrupted before a result arrived.
    Interrupted,
    /// The owning project was closed.
    Disposed,
}

/// Cancellation signal raised by the orchestrator.
///
/// Kept apart from [`super::CommandError`] so it can never be mistaken for an
/// ordinary failed computation. Layers that receive it propagate it unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancelled {
    pub operation: String,
    pub reason: CancelReason,
}

impl Cancelled {
    #[must_use]
    pub fn new(operation: impl Into<String>, reason: CancelReason) -> Self {
        Self {
            operation: operation.into(),
            reason,
        }
    }

    #[must_use]
    pub fn timed_out(operation: impl Into<String>, after: Duration) -> Self {
        Self::new(operation, CancelReason::TimedOut(after))
    }

    #[must_use]
    pub fn interrupted(operation: impl Into<String>) -> Self {
        Self::new(operation, CancelReason::Interrupted)
    }

    #[must_use]
    pub fn disposed(operation: impl Into<String>) -> Self {
        Self::new(operation, CancelReason::Disposed)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.reason, CancelReason::TimedOut(_))
    }
}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            CancelReason::TimedOut(after) => {
                write!(f, "'{}' was cancelled after {after:?}", self.operation)
            }
            CancelReason::Interrupted => write!(f, "'{}' was interrupted", self.operation),
            CancelReason::Disposed => {
                write!(f, "'{}' was cancelled because the project closed", self.operation)
            }
        }
    }
}

impl std::error::Error for Cancelled {}
