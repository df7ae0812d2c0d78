//! Lifecycle supervision for long-running services.
//!
//! This crate gives any long-running unit of work -- a "service" -- a uniform state machine
//! (`Stopped` → `Starting` → `Running` → `Stopping` → `Stopped`, with `Crashed` as a terminal
//! escape hatch reachable from any other state) and a pool abstraction that runs many
//! services as concurrent tasks, aggregates their state, and enforces a single coordinated
//! shutdown when any member stops, crashes, or is asked to stop.
//!
//! # Services
//!
//! A service is anything implementing the [`Service`] trait: it has a human-readable name, and a
//! `run` method that executes the unit of work. The `run` implementation drives its own
//! [`Lifecycle`], calling the transition methods as it moves through the stages of its life and
//! observing the lifecycle's run context to learn when it should begin winding down.
//!
//! # Lifecycles
//!
//! Every running service is paired with exactly one [`Lifecycle`]: the state machine itself, plus
//! the narrow control surface a service calls into (transitions, run context, shutdown context)
//! and the narrow observation surface a supervisor calls into (callback registration, `run`,
//! `stop`, recorded error). State-change callbacks always fire with the lifecycle's internal lock
//! released, so a callback may safely re-enter the lifecycle that invoked it.
//!
//! # Pools
//!
//! A [`Pool`] supervises a set of member services, each wrapped in its own lifecycle. The pool
//! reports `Running` only once every member has, and any single member stopping or crashing tears
//! down all of its siblings: all-for-one supervision, with no restart policy. A pool is itself a
//! [`Service`], so pools nest without special-casing.
//!
//! See the `basic_pool` example for how services, lifecycles, and pools compose.

#![deny(warnings)]
#![deny(missing_docs)]

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::Instrument as _;

mod lifecycle;
pub use self::lifecycle::{CrashError, Lifecycle, LifecycleFactory, ServiceState};

mod pool;
pub use self::pool::Pool;

mod service;
pub use self::service::Service;

mod shutdown;
pub use self::shutdown::ShutdownContext;

/// Spawns a new asynchronous task, returning a [`JoinHandle`] for it.
///
/// This function is a thin wrapper over [`tokio::spawn`] that attaches the spawned future to the
/// current `tracing` span, preserving the causal relationship between a supervisor and the
/// service tasks it launches.
pub fn spawn_traced<F, R>(f: F) -> JoinHandle<R>
where
    F: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    tokio::spawn(f.in_current_span())
}
