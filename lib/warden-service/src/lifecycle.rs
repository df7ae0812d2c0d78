use std::{
    fmt,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex},
};

use futures::FutureExt as _;
use snafu::Snafu;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use warden_error::GenericError;

use crate::{Service, ShutdownContext};

/// The current state of a service's lifecycle.
///
/// On the happy path, states advance monotonically through `Stopped` → `Starting` → `Running` →
/// `Stopping` → `Stopped`. `Crashed` is terminal and reachable from any other state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServiceState {
    /// The service is not running. This is both the initial state and the clean terminal state.
    Stopped,

    /// The service has begun executing but is not yet ready to serve.
    Starting,

    /// The service is ready and serving.
    Running,

    /// The service has been asked to stop and is winding down gracefully.
    Stopping,

    /// The service exited abnormally. Terminal; no further transitions are accepted.
    Crashed,
}

impl ServiceState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Crashed => "crashed",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthetic crash causes recorded by the supervision machinery itself.
#[derive(Debug, Snafu)]
pub enum CrashError {
    /// The service panicked while executing, and the panic was trapped at the supervision
    /// boundary.
    #[snafu(display("service '{}' panicked", service))]
    Panicked {
        /// The name of the service that panicked.
        service: String,
    },
}

type TransitionCallback = Arc<dyn Fn() + Send + Sync>;
type StoppingCallback = Arc<dyn Fn(ShutdownContext) + Send + Sync>;
type CrashedCallback = Arc<dyn Fn(&GenericError) + Send + Sync>;
type StateChangeCallback = Arc<dyn Fn(ServiceState) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    on_starting: Vec<TransitionCallback>,
    on_running: Vec<TransitionCallback>,
    on_stopping: Vec<StoppingCallback>,
    on_stopped: Vec<TransitionCallback>,
    on_crashed: Vec<CrashedCallback>,
    on_state_change: Vec<StateChangeCallback>,
}

struct Shared {
    state: ServiceState,
    started: bool,
    stop_requested: bool,
    shutdown: ShutdownContext,
    error: Option<Arc<GenericError>>,
    subscribers: Subscribers,
}

struct Inner {
    service: Arc<dyn Service>,
    run_token: CancellationToken,
    state_tx: watch::Sender<ServiceState>,
    shared: Mutex<Shared>,
}

/// The per-service state machine, plus its control and observation surfaces.
///
/// A `Lifecycle` is created once for a given service and is not reusable across two independent
/// runs. It is cheaply cloneable; all clones refer to the same state machine.
///
/// The supervised service calls the transition methods ([`starting`][Self::starting],
/// [`running`][Self::running], [`stopping`][Self::stopping], [`stopped`][Self::stopped],
/// [`crashed`][Self::crashed]) as it moves through the stages of its life, and observes
/// [`run_context`][Self::run_context] to learn when it should begin winding down. A supervisor
/// registers callbacks before invoking [`run`][Self::run], and requests shutdown through
/// [`stop`][Self::stop].
///
/// Transition methods applied out of order are silent no-ops, so idempotent re-application never
/// re-fires already-fired callbacks. Callbacks are always invoked with the lifecycle's internal
/// lock released, so a callback may safely call back into the lifecycle, such as a pool's
/// state-change handler stopping a sibling service.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Lifecycle {
    /// Creates a lifecycle bound to the given service.
    pub fn new(service: Arc<dyn Service>) -> Self {
        let (state_tx, _) = watch::channel(ServiceState::Stopped);

        Self {
            inner: Arc::new(Inner {
                service,
                run_token: CancellationToken::new(),
                state_tx,
                shared: Mutex::new(Shared {
                    state: ServiceState::Stopped,
                    started: false,
                    stop_requested: false,
                    shutdown: ShutdownContext::background(),
                    error: None,
                    subscribers: Subscribers::default(),
                }),
            }),
        }
    }

    /// Returns the name of the bound service.
    pub fn service_name(&self) -> &str {
        self.inner.service.name()
    }

    /// Returns the current state.
    pub fn state(&self) -> ServiceState {
        self.inner.shared.lock().unwrap().state
    }

    /// Returns the recorded crash cause, if the service has crashed.
    ///
    /// Only the first-recorded cause is retained.
    pub fn error(&self) -> Option<Arc<GenericError>> {
        self.inner.shared.lock().unwrap().error.clone()
    }

    /// Returns the run context for the service.
    ///
    /// The returned token is cancelled when a stop has been requested; the service observes the
    /// cancellation to learn that it must begin stopping.
    pub fn run_context(&self) -> CancellationToken {
        self.inner.run_token.clone()
    }

    /// Returns the shutdown context for the service.
    ///
    /// Until a stop has been requested, this is a non-expiring background context. Once a stop is
    /// requested, it is the deadline context supplied by the caller of [`stop`][Self::stop],
    /// bounding graceful cleanup.
    pub fn shutdown_context(&self) -> ShutdownContext {
        self.inner.shared.lock().unwrap().shutdown.clone()
    }

    /// Transitions `Stopped` → `Starting`. Ignored in any other state.
    pub fn starting(&self) {
        let (on_starting, on_state_change) = {
            let mut shared = self.inner.shared.lock().unwrap();
            if shared.state != ServiceState::Stopped {
                return;
            }
            shared.state = ServiceState::Starting;

            (
                shared.subscribers.on_starting.clone(),
                shared.subscribers.on_state_change.clone(),
            )
        };

        debug!(service = self.service_name(), "Service starting.");
        for callback in &on_starting {
            callback();
        }
        for callback in &on_state_change {
            callback(ServiceState::Starting);
        }
        self.inner.state_tx.send_replace(ServiceState::Starting);
    }

    /// Transitions `Starting` → `Running`. Ignored in any other state.
    pub fn running(&self) {
        let (on_running, on_state_change) = {
            let mut shared = self.inner.shared.lock().unwrap();
            if shared.state != ServiceState::Starting {
                return;
            }
            shared.state = ServiceState::Running;

            (
                shared.subscribers.on_running.clone(),
                shared.subscribers.on_state_change.clone(),
            )
        };

        debug!(service = self.service_name(), "Service running.");
        for callback in &on_running {
            callback();
        }
        for callback in &on_state_change {
            callback(ServiceState::Running);
        }
        self.inner.state_tx.send_replace(ServiceState::Running);
    }

    /// Transitions `Running` → `Stopping`, returning the shutdown context that bounds graceful
    /// cleanup.
    ///
    /// Also valid from `Starting`, for when a stop request arrives before the service finished
    /// starting. In any other state this only returns the shutdown context, without transitioning
    /// or re-firing callbacks.
    pub fn stopping(&self) -> ShutdownContext {
        let (shutdown, callbacks) = {
            let mut shared = self.inner.shared.lock().unwrap();
            let shutdown = shared.shutdown.clone();
            if shared.state != ServiceState::Starting && shared.state != ServiceState::Running {
                return shutdown;
            }
            shared.state = ServiceState::Stopping;

            let callbacks = (
                shared.subscribers.on_stopping.clone(),
                shared.subscribers.on_state_change.clone(),
            );
            (shutdown, callbacks)
        };

        debug!(service = self.service_name(), "Service stopping.");
        for callback in &callbacks.0 {
            callback(shutdown.clone());
        }
        for callback in &callbacks.1 {
            callback(ServiceState::Stopping);
        }
        self.inner.state_tx.send_replace(ServiceState::Stopping);

        shutdown
    }

    /// Transitions `Stopping` → `Stopped`, the clean terminal state. Ignored in any other state.
    pub fn stopped(&self) {
        let (on_stopped, on_state_change) = {
            let mut shared = self.inner.shared.lock().unwrap();
            if shared.state != ServiceState::Stopping {
                return;
            }
            shared.state = ServiceState::Stopped;

            (
                shared.subscribers.on_stopped.clone(),
                shared.subscribers.on_state_change.clone(),
            )
        };

        debug!(service = self.service_name(), "Service stopped.");
        for callback in &on_stopped {
            callback();
        }
        for callback in &on_state_change {
            callback(ServiceState::Stopped);
        }
        self.inner.state_tx.send_replace(ServiceState::Stopped);
    }

    /// Transitions any non-`Crashed` state to `Crashed`, recording `err` as the crash cause.
    ///
    /// Terminal: once crashed, all further transitions are no-ops. Only the first-recorded cause
    /// is retained.
    pub fn crashed(&self, err: GenericError) {
        let (cause, on_crashed, on_state_change) = {
            let mut shared = self.inner.shared.lock().unwrap();
            if shared.state == ServiceState::Crashed {
                return;
            }
            shared.state = ServiceState::Crashed;

            let cause = Arc::new(err);
            shared.error = Some(Arc::clone(&cause));

            (
                cause,
                shared.subscribers.on_crashed.clone(),
                shared.subscribers.on_state_change.clone(),
            )
        };

        error!(service = self.service_name(), error = %cause, "Service crashed.");
        for callback in &on_crashed {
            callback(&cause);
        }
        for callback in &on_state_change {
            callback(ServiceState::Crashed);
        }
        self.inner.state_tx.send_replace(ServiceState::Crashed);
    }

    /// Registers a callback invoked when the service enters `Starting`.
    ///
    /// # Panics
    ///
    /// Panics if the lifecycle's `run` has already been invoked: observer registration is only
    /// valid before the lifecycle starts.
    pub fn on_starting<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(|subscribers| subscribers.on_starting.push(Arc::new(f)));
    }

    /// Registers a callback invoked when the service enters `Running`.
    ///
    /// # Panics
    ///
    /// Panics if the lifecycle's `run` has already been invoked.
    pub fn on_running<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(|subscribers| subscribers.on_running.push(Arc::new(f)));
    }

    /// Registers a callback invoked when the service enters `Stopping`, receiving the shutdown
    /// context that bounds graceful cleanup.
    ///
    /// # Panics
    ///
    /// Panics if the lifecycle's `run` has already been invoked.
    pub fn on_stopping<F>(&self, f: F)
    where
        F: Fn(ShutdownContext) + Send + Sync + 'static,
    {
        self.register(|subscribers| subscribers.on_stopping.push(Arc::new(f)));
    }

    /// Registers a callback invoked when the service enters `Stopped`.
    ///
    /// # Panics
    ///
    /// Panics if the lifecycle's `run` has already been invoked.
    pub fn on_stopped<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(|subscribers| subscribers.on_stopped.push(Arc::new(f)));
    }

    /// Registers a callback invoked when the service enters `Crashed`, receiving the recorded
    /// crash cause.
    ///
    /// # Panics
    ///
    /// Panics if the lifecycle's `run` has already been invoked.
    pub fn on_crashed<F>(&self, f: F)
    where
        F: Fn(&GenericError) + Send + Sync + 'static,
    {
        self.register(|subscribers| subscribers.on_crashed.push(Arc::new(f)));
    }

    /// Registers a callback invoked on every state transition, receiving the new state.
    ///
    /// For a given transition, the transition-specific callbacks fire first, followed by the
    /// state-change callbacks.
    ///
    /// # Panics
    ///
    /// Panics if the lifecycle's `run` has already been invoked.
    pub fn on_state_change<F>(&self, f: F)
    where
        F: Fn(ServiceState) + Send + Sync + 'static,
    {
        self.register(|subscribers| subscribers.on_state_change.push(Arc::new(f)));
    }

    fn register<F>(&self, f: F)
    where
        F: FnOnce(&mut Subscribers),
    {
        let mut shared = self.inner.shared.lock().unwrap();
        if shared.started {
            panic!("bug: lifecycle already started, cannot register observers");
        }
        f(&mut shared.subscribers);
    }

    /// Runs the bound service to completion.
    ///
    /// The service receives a clone of this lifecycle and is expected to drive the transition
    /// methods per the [`Service`] contract. A panic raised by the service is trapped and
    /// converted into a `Crashed` transition with a [`CrashError::Panicked`] cause; an `Err`
    /// return likewise becomes a `Crashed` transition. A service that returns cleanly without
    /// reaching a terminal state is driven through the remaining happy-path transitions.
    ///
    /// Returns the recorded crash cause, or `Ok(())` on a clean stop.
    ///
    /// # Panics
    ///
    /// Panics if `run` has already been invoked on this lifecycle.
    pub async fn run(&self) -> Result<(), GenericError> {
        {
            let mut shared = self.inner.shared.lock().unwrap();
            if shared.started {
                panic!("bug: lifecycle already running, cannot run again");
            }
            shared.started = true;
        }

        let service = Arc::clone(&self.inner.service);
        let run_result = AssertUnwindSafe(service.run(self.clone())).catch_unwind().await;
        match run_result {
            Ok(Ok(())) => {
                // A well-behaved service has already driven itself to a terminal state by now;
                // finish any transitions it skipped, such as returning cleanly while still
                // running.
                if !matches!(self.state(), ServiceState::Stopped | ServiceState::Crashed) {
                    self.stopping();
                    self.stopped();
                }
            }
            Ok(Err(err)) => self.crashed(err),
            Err(_) => {
                let service = self.service_name().to_string();
                self.crashed(CrashError::Panicked { service }.into());
            }
        }

        match self.error() {
            Some(cause) => Err(GenericError::msg(cause)),
            None => Ok(()),
        }
    }

    /// Requests that the service stop, and waits for it to reach a terminal state.
    ///
    /// The first call installs `shutdown` as the service's shutdown context and cancels the run
    /// context; subsequent calls skip that step, so stopping is idempotent and safe to call
    /// concurrently with the service's own transitions. Every call waits until the lifecycle
    /// reaches `Stopped` or `Crashed`.
    pub async fn stop(&self, shutdown: ShutdownContext) {
        let newly_requested = {
            let mut shared = self.inner.shared.lock().unwrap();
            if shared.stop_requested {
                false
            } else {
                shared.stop_requested = true;
                shared.shutdown = shutdown;
                true
            }
        };

        if newly_requested {
            debug!(service = self.service_name(), "Stop requested.");
            self.inner.run_token.cancel();
        }

        let mut state_rx = self.inner.state_tx.subscribe();
        let _ = state_rx
            .wait_for(|state| matches!(state, ServiceState::Stopped | ServiceState::Crashed))
            .await;
    }
}

/// Creates lifecycles bound to services.
///
/// Exists so a [`Pool`][crate::Pool] can mint lifecycles for its members without taking a direct
/// dependency on lifecycle construction details.
#[derive(Clone, Default)]
pub struct LifecycleFactory;

impl LifecycleFactory {
    /// Creates a new `LifecycleFactory`.
    pub fn new() -> Self {
        Self
    }

    /// Creates a lifecycle bound to the given service.
    pub fn make(&self, service: Arc<dyn Service>) -> Lifecycle {
        Lifecycle::new(service)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::{
        sync::{mpsc, Notify},
        time::timeout,
    };
    use tokio_test::assert_ok;
    use warden_error::generic_error;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    #[derive(Clone, Copy)]
    enum RunBehavior {
        /// Runs until the run context is cancelled, then stops cleanly.
        UntilCancelled,
        /// Returns an error when the crash signal fires.
        CrashOnSignal,
        /// Panics when the crash signal fires.
        PanicOnSignal,
    }

    #[derive(Clone)]
    struct MockService {
        service_name: &'static str,
        behavior: RunBehavior,
        crash: Arc<Notify>,
    }

    impl MockService {
        fn until_cancelled(service_name: &'static str) -> Self {
            Self::with_behavior(service_name, RunBehavior::UntilCancelled)
        }

        fn crash_on_signal(service_name: &'static str) -> Self {
            Self::with_behavior(service_name, RunBehavior::CrashOnSignal)
        }

        fn panic_on_signal(service_name: &'static str) -> Self {
            Self::with_behavior(service_name, RunBehavior::PanicOnSignal)
        }

        fn with_behavior(service_name: &'static str, behavior: RunBehavior) -> Self {
            Self {
                service_name,
                behavior,
                crash: Arc::new(Notify::new()),
            }
        }

        fn trigger_crash(&self) {
            self.crash.notify_one();
        }
    }

    #[async_trait]
    impl Service for MockService {
        fn name(&self) -> &str {
            self.service_name
        }

        async fn run(&self, lifecycle: Lifecycle) -> Result<(), GenericError> {
            lifecycle.starting();
            lifecycle.running();

            let run_context = lifecycle.run_context();
            tokio::select! {
                _ = run_context.cancelled() => {
                    lifecycle.stopping();
                    lifecycle.stopped();
                    Ok(())
                },
                _ = self.crash.notified() => match self.behavior {
                    RunBehavior::UntilCancelled => Ok(()),
                    RunBehavior::CrashOnSignal => Err(generic_error!("mock service crashed")),
                    RunBehavior::PanicOnSignal => panic!("mock service panicked"),
                },
            }
        }
    }

    fn state_recorder(lifecycle: &Lifecycle) -> Arc<Mutex<Vec<ServiceState>>> {
        let states = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&states);
        lifecycle.on_state_change(move |state| recorder.lock().unwrap().push(state));
        states
    }

    fn running_signal(lifecycle: &Lifecycle) -> mpsc::UnboundedReceiver<()> {
        let (running_tx, running_rx) = mpsc::unbounded_channel();
        lifecycle.on_running(move || {
            let _ = running_tx.send(());
        });
        running_rx
    }

    #[tokio::test]
    async fn clean_run_observes_full_state_sequence() {
        let lifecycle = Lifecycle::new(Arc::new(MockService::until_cancelled("mock")));
        let states = state_recorder(&lifecycle);
        let mut running_rx = running_signal(&lifecycle);

        let runner = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.run().await })
        };

        timeout(WAIT, running_rx.recv()).await.unwrap();
        timeout(WAIT, lifecycle.stop(ShutdownContext::background()))
            .await
            .unwrap();

        let result = timeout(WAIT, runner).await.unwrap().unwrap();
        assert_ok!(result);

        assert_eq!(
            *states.lock().unwrap(),
            vec![
                ServiceState::Starting,
                ServiceState::Running,
                ServiceState::Stopping,
                ServiceState::Stopped
            ]
        );
    }

    #[tokio::test]
    async fn crash_records_cause_and_fires_crash_callbacks() {
        let service = MockService::crash_on_signal("mock");
        let lifecycle = Lifecycle::new(Arc::new(service.clone()));
        let mut running_rx = running_signal(&lifecycle);

        let (crashed_tx, mut crashed_rx) = mpsc::unbounded_channel();
        lifecycle.on_crashed(move |err| {
            let _ = crashed_tx.send(err.to_string());
        });

        let reached_stopping = Arc::new(Mutex::new(false));
        {
            let reached_stopping = Arc::clone(&reached_stopping);
            lifecycle.on_stopping(move |_| *reached_stopping.lock().unwrap() = true);
        }

        let runner = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.run().await })
        };

        timeout(WAIT, running_rx.recv()).await.unwrap();
        service.trigger_crash();

        let crash_message = timeout(WAIT, crashed_rx.recv()).await.unwrap().unwrap();
        assert_eq!(crash_message, "mock service crashed");

        let result = timeout(WAIT, runner).await.unwrap().unwrap();
        assert_eq!(result.unwrap_err().to_string(), "mock service crashed");

        assert_eq!(lifecycle.state(), ServiceState::Crashed);
        assert!(lifecycle.error().is_some());
        assert!(!*reached_stopping.lock().unwrap(), "crash must not pass through stopping");
    }

    #[tokio::test]
    async fn crashed_is_terminal_and_first_cause_wins() {
        let lifecycle = Lifecycle::new(Arc::new(MockService::until_cancelled("mock")));

        lifecycle.starting();
        lifecycle.crashed(generic_error!("first cause"));
        lifecycle.crashed(generic_error!("second cause"));

        assert_eq!(lifecycle.state(), ServiceState::Crashed);
        assert_eq!(lifecycle.error().unwrap().to_string(), "first cause");

        // All further transitions must be no-ops.
        lifecycle.starting();
        lifecycle.running();
        lifecycle.stopping();
        lifecycle.stopped();
        assert_eq!(lifecycle.state(), ServiceState::Crashed);
    }

    #[tokio::test]
    async fn double_stop_produces_single_stop_sequence() {
        let lifecycle = Lifecycle::new(Arc::new(MockService::until_cancelled("mock")));
        let states = state_recorder(&lifecycle);
        let mut running_rx = running_signal(&lifecycle);

        let runner = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.run().await })
        };

        timeout(WAIT, running_rx.recv()).await.unwrap();

        let first = lifecycle.stop(ShutdownContext::background());
        let second = lifecycle.stop(ShutdownContext::background());
        timeout(WAIT, async { tokio::join!(first, second) }).await.unwrap();

        let result = timeout(WAIT, runner).await.unwrap().unwrap();
        assert_ok!(result);

        assert_eq!(
            *states.lock().unwrap(),
            vec![
                ServiceState::Starting,
                ServiceState::Running,
                ServiceState::Stopping,
                ServiceState::Stopped
            ]
        );
    }

    #[tokio::test]
    async fn panic_is_trapped_as_crash() {
        let service = MockService::panic_on_signal("mock");
        let lifecycle = Lifecycle::new(Arc::new(service.clone()));
        let mut running_rx = running_signal(&lifecycle);

        let runner = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.run().await })
        };

        timeout(WAIT, running_rx.recv()).await.unwrap();
        service.trigger_crash();

        let result = timeout(WAIT, runner).await.unwrap().unwrap();
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "service 'mock' panicked");
        assert_eq!(lifecycle.state(), ServiceState::Crashed);
    }

    #[tokio::test]
    async fn service_returning_early_is_driven_to_stopped() {
        // A service that returns cleanly while still running: the lifecycle finishes the
        // remaining happy-path transitions on its behalf.
        let service = MockService::until_cancelled("mock");
        let lifecycle = Lifecycle::new(Arc::new(service.clone()));
        let states = state_recorder(&lifecycle);
        let mut running_rx = running_signal(&lifecycle);

        let runner = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.run().await })
        };

        timeout(WAIT, running_rx.recv()).await.unwrap();
        service.trigger_crash();

        let result = timeout(WAIT, runner).await.unwrap().unwrap();
        assert_ok!(result);

        assert_eq!(
            *states.lock().unwrap(),
            vec![
                ServiceState::Starting,
                ServiceState::Running,
                ServiceState::Stopping,
                ServiceState::Stopped
            ]
        );
    }

    #[tokio::test]
    #[should_panic(expected = "bug: lifecycle already started")]
    async fn registering_observer_after_run_panics() {
        let lifecycle = Lifecycle::new(Arc::new(MockService::until_cancelled("mock")));
        let mut running_rx = running_signal(&lifecycle);

        let _runner = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.run().await })
        };

        timeout(WAIT, running_rx.recv()).await.unwrap();
        lifecycle.on_stopped(|| {});
    }

    #[tokio::test]
    #[should_panic(expected = "bug: lifecycle already running")]
    async fn running_a_lifecycle_twice_panics() {
        let lifecycle = Lifecycle::new(Arc::new(MockService::until_cancelled("mock")));
        let mut running_rx = running_signal(&lifecycle);

        let _runner = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.run().await })
        };

        timeout(WAIT, running_rx.recv()).await.unwrap();
        let _ = lifecycle.run().await;
    }
}
