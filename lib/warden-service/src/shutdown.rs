use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// An advisory grace-period budget for graceful shutdown.
///
/// When a service is asked to stop, the caller supplies a `ShutdownContext` describing how long
/// the service may spend on graceful cleanup. Consumers are expected to observe [`done`][Self::done]
/// (or poll [`is_expired`][Self::is_expired]) and abort cleanup once the budget runs out. The
/// budget is purely advisory: the supervisor never forcibly kills a non-cooperating service.
#[derive(Clone)]
pub struct ShutdownContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ShutdownContext {
    /// Creates a shutdown context that never expires.
    pub fn background() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Creates a shutdown context that expires after the given duration.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Creates a shutdown context that expires at the given instant.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Returns the deadline of this context, if it has one.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Expires this context immediately, for all clones of it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` if the deadline has passed or the context was cancelled.
    pub fn is_expired(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Waits until the deadline passes or the context is cancelled.
    ///
    /// For a context created with [`background`][Self::background], this only resolves if the
    /// context is explicitly cancelled.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {},
                    _ = self.cancel.cancelled() => {},
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}
