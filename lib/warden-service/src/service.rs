use async_trait::async_trait;
use warden_error::GenericError;

use crate::Lifecycle;

/// A supervisable unit of long-running work.
///
/// `Service` is the only contract external collaborators must implement. The supervision
/// machinery never inspects a service beyond its name and its `run` method: everything else flows
/// through the [`Lifecycle`] handed to `run`.
#[async_trait]
pub trait Service: Send + Sync {
    /// Returns a human-readable name for the service, used only for diagnostics.
    fn name(&self) -> &str;

    /// Executes the service, returning when it has finished.
    ///
    /// Returns an error only if the service finished abnormally. The implementation must observe
    /// the given lifecycle and call the appropriate transition methods as it enters the stages of
    /// its life:
    ///
    /// - Call [`Lifecycle::starting`] immediately on entry.
    /// - Call [`Lifecycle::running`] once ready to serve.
    /// - While running, watch [`Lifecycle::run_context`] for cancellation (either by polling it
    ///   in a `select!` or by blocking on it) to detect a stop request.
    /// - On detecting cancellation, call [`Lifecycle::stopping`], perform cleanup bounded by the
    ///   returned [`ShutdownContext`][crate::ShutdownContext]'s deadline, and then call
    ///   [`Lifecycle::stopped`]. When the shutdown context expires, graceful cleanup must be
    ///   abandoned and the service must stop as soon as possible.
    /// - On abnormal exit, call [`Lifecycle::crashed`] and/or return a non-`Ok` result.
    ///
    /// A panic raised during `run` is trapped at the supervision boundary and converted into a
    /// `Crashed` transition, so implementations are not required to trap their own panics, though
    /// doing so yields a more precise recorded cause.
    async fn run(&self, lifecycle: Lifecycle) -> Result<(), GenericError>;
}
