use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error};
use warden_error::GenericError;

use crate::{spawn_traced, Lifecycle, LifecycleFactory, Service, ServiceState, ShutdownContext};

struct Member {
    service: Arc<dyn Service>,
    lifecycle: Lifecycle,
    state: ServiceState,
    finished: bool,
}

struct PoolShared {
    members: Vec<Member>,
    running: bool,
    ran: bool,
    stopping: bool,
    last_error: Option<Arc<GenericError>>,
    startup_tx: mpsc::Sender<()>,
    finished_tx: mpsc::Sender<()>,
}

struct PoolInner {
    factory: LifecycleFactory,
    shared: Mutex<PoolShared>,
}

impl PoolInner {
    /// Reacts to a state change on the member at `member_idx`.
    ///
    /// Registered on every member's lifecycle at `add` time. Runs on whichever task drove the
    /// member's transition, so it must never block: completion signals are published with
    /// non-blocking sends, and stop fan-out spawns tasks rather than awaiting them.
    fn handle_member_state_change(inner: &Arc<PoolInner>, member_idx: usize, new_state: ServiceState) {
        let mut shared = inner.shared.lock().unwrap();
        if shared.members[member_idx].state == new_state {
            return;
        }
        shared.members[member_idx].state = new_state;

        match new_state {
            ServiceState::Starting => {}
            ServiceState::Running => {
                // Guaranteed a slot: the channel is sized to the membership and the duplicate
                // check above ensures each member publishes at most once.
                let _ = shared.startup_tx.try_send(());
            }
            ServiceState::Stopping => {
                // A member beginning its own graceful exit tears down its siblings.
                Self::trigger_stop_locked(&mut shared, ShutdownContext::background());
            }
            ServiceState::Stopped => {
                Self::trigger_stop_locked(&mut shared, ShutdownContext::background());
                Self::publish_finished_locked(&mut shared, member_idx);
            }
            ServiceState::Crashed => {
                if shared.last_error.is_none() {
                    shared.last_error = shared.members[member_idx].lifecycle.error();
                }
                Self::trigger_stop_locked(&mut shared, ShutdownContext::background());
                Self::publish_finished_locked(&mut shared, member_idx);
            }
        }
    }

    /// Publishes the member's completion signal, at most once per run.
    ///
    /// A member can reach both terminal states in one run, such as stopping cleanly and then
    /// failing during final teardown, so the publication is latched per member rather than relying
    /// on the state transition alone: the pool counts each member exactly once.
    fn publish_finished_locked(shared: &mut PoolShared, member_idx: usize) {
        let member = &mut shared.members[member_idx];
        if member.finished {
            return;
        }
        member.finished = true;

        // Guaranteed a slot: the channel is sized to the membership and the latch above ensures
        // each member publishes at most once.
        let _ = shared.finished_tx.try_send(());
    }

    fn trigger_stop_locked(shared: &mut PoolShared, shutdown: ShutdownContext) {
        if shared.stopping {
            return;
        }
        shared.stopping = true;

        debug!("Service pool stopping all members.");
        for member in &shared.members {
            let lifecycle = member.lifecycle.clone();
            let shutdown = shutdown.clone();
            spawn_traced(async move { lifecycle.stop(shutdown).await });
        }
    }
}

/// A composite [`Service`] that supervises a set of member services.
///
/// Each member added to the pool is wrapped in its own [`Lifecycle`] and run as an independent
/// task. The pool aggregates member state: it reports `Running` only once every member has
/// reported running (or proceeds straight to shutdown if any member finishes first), and any
/// member stopping, crashing, or an external stop request triggers a coordinated fan-out stop of
/// every member. The pool only reports terminal once every member has.
///
/// Failure semantics are all-for-one: a single member crashing or exiting tears down the whole
/// pool, with no restart policy and no partial-failure tolerance. The first crash cause recorded
/// anywhere in the pool becomes the pool's own error.
///
/// A pool is itself a [`Service`], run by wrapping it in a [`Lifecycle`] like any other service,
/// so pools can be nested as members of other pools. Unlike a bare lifecycle, a pool instance may
/// be run again after a run completes (wrapped in a fresh enclosing lifecycle): per-run signaling
/// state is re-armed and member lifecycles are minted fresh at the start of every run.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::with_factory(LifecycleFactory::new())
    }

    /// Creates an empty pool that mints member lifecycles with the given factory.
    pub fn with_factory(factory: LifecycleFactory) -> Self {
        // Placeholder channels, re-armed at the start of every run.
        let (startup_tx, _) = mpsc::channel(1);
        let (finished_tx, _) = mpsc::channel(1);

        Self {
            inner: Arc::new(PoolInner {
                factory,
                shared: Mutex::new(PoolShared {
                    members: Vec::new(),
                    running: false,
                    ran: false,
                    stopping: false,
                    last_error: None,
                    startup_tx,
                    finished_tx,
                }),
            }),
        }
    }

    /// Adds a service to the pool, returning the lifecycle created for it.
    ///
    /// The pool subscribes its own state-change handler to the lifecycle; the caller may register
    /// additional observers on the returned lifecycle before the pool is run. A lifecycle is
    /// single-run, so the returned handle covers the pool's first run only: subsequent runs mint
    /// fresh lifecycles for every member.
    ///
    /// # Panics
    ///
    /// Panics if the pool is already running: membership is fixed once a run begins.
    pub fn add<S>(&self, service: S) -> Lifecycle
    where
        S: Service + 'static,
    {
        let mut shared = self.inner.shared.lock().unwrap();
        if shared.running {
            panic!("bug: pool already running, cannot add service");
        }

        let service: Arc<dyn Service> = Arc::new(service);
        let member_idx = shared.members.len();
        let lifecycle = self.mint_member_lifecycle(Arc::clone(&service), member_idx);

        debug!(
            service = lifecycle.service_name(),
            member = member_idx,
            "Adding service to pool."
        );
        shared.members.push(Member {
            service,
            lifecycle: lifecycle.clone(),
            state: ServiceState::Stopped,
            finished: false,
        });

        lifecycle
    }

    fn mint_member_lifecycle(&self, service: Arc<dyn Service>, member_idx: usize) -> Lifecycle {
        let lifecycle = self.inner.factory.make(service);

        let inner = Arc::clone(&self.inner);
        lifecycle.on_state_change(move |state| PoolInner::handle_member_state_change(&inner, member_idx, state));

        lifecycle
    }

    fn begin_run(&self) -> (Vec<Lifecycle>, mpsc::Receiver<()>, mpsc::Receiver<()>) {
        let mut shared = self.inner.shared.lock().unwrap();
        if shared.running {
            panic!("bug: pool already running, cannot run again");
        }

        // Lifecycles are single-run, so on every run after the first, every member gets a fresh
        // lifecycle wired back into the pool's state-change handling. This is what makes the pool
        // itself reusable across independent runs even though a bare lifecycle is not.
        if shared.ran {
            for member_idx in 0..shared.members.len() {
                let service = Arc::clone(&shared.members[member_idx].service);
                let lifecycle = self.mint_member_lifecycle(service, member_idx);

                let member = &mut shared.members[member_idx];
                member.lifecycle = lifecycle;
                member.state = ServiceState::Stopped;
                member.finished = false;
            }
        }

        shared.running = true;
        shared.ran = true;
        shared.stopping = false;
        shared.last_error = None;

        // Re-arm the one-shot completion signaling. Publishes are non-blocking, so a late signal
        // never blocks the sender; sizing the channels to the membership guarantees a slot for
        // every member, since each member publishes each signal at most once.
        let capacity = shared.members.len().max(1);
        let (startup_tx, startup_rx) = mpsc::channel(capacity);
        let (finished_tx, finished_rx) = mpsc::channel(capacity);
        shared.startup_tx = startup_tx;
        shared.finished_tx = finished_tx;

        let member_lifecycles = shared.members.iter().map(|member| member.lifecycle.clone()).collect();
        (member_lifecycles, startup_rx, finished_rx)
    }

    fn trigger_stop(&self, shutdown: ShutdownContext) {
        let mut shared = self.inner.shared.lock().unwrap();
        PoolInner::trigger_stop_locked(&mut shared, shutdown);
    }
}

#[async_trait]
impl Service for Pool {
    fn name(&self) -> &str {
        "service pool"
    }

    async fn run(&self, lifecycle: Lifecycle) -> Result<(), GenericError> {
        let (member_lifecycles, mut startup_rx, mut finished_rx) = self.begin_run();

        lifecycle.starting();

        for member in &member_lifecycles {
            let member = member.clone();
            spawn_traced(async move {
                // The member's lifecycle records any failure itself; nothing to propagate here.
                let _ = member.run().await;
            });
        }

        // Wait for every member to report running, unless one of them finishes first, in which
        // case startup is aborted and we proceed straight to shutdown.
        let member_count = member_lifecycles.len();
        let mut outstanding = member_count;
        let mut startup_aborted = false;
        for _ in 0..member_count {
            tokio::select! {
                _ = startup_rx.recv() => {},
                _ = finished_rx.recv() => {
                    outstanding -= 1;
                    startup_aborted = true;
                    break;
                },
            }
        }

        if startup_aborted {
            debug!("Member finished during pool startup, aborting startup.");
            self.trigger_stop(ShutdownContext::background());
        } else {
            lifecycle.running();

            let run_context = lifecycle.run_context();
            tokio::select! {
                _ = finished_rx.recv() => {
                    // A member finished on its own; its state-change handler has already begun
                    // the stop fan-out.
                    outstanding -= 1;
                },
                _ = run_context.cancelled() => {
                    let shutdown = lifecycle.stopping();
                    self.trigger_stop(shutdown);
                },
            }
        }

        // Never report terminal before every member has.
        for _ in 0..outstanding {
            let _ = finished_rx.recv().await;
        }

        let last_error = {
            let mut shared = self.inner.shared.lock().unwrap();
            shared.running = false;
            shared.last_error.clone()
        };

        match last_error {
            Some(err) => {
                error!(error = %err, "Service pool member failed.");
                Err(GenericError::msg(err))
            }
            None => Ok(()),
        }
    }
}
