use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::select;
use tracing::{error, info};
use warden_error::{ErrorContext as _, GenericError};
use warden_service::{Lifecycle, Pool, ServiceState, ShutdownContext};

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    tracing_subscriber::fmt::fmt()
        .with_ansi(true)
        .compact()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Build a pool with a few long-running services. The pool reports running only once every
    // member has, and tears down all members as soon as any one of them stops or crashes -- or,
    // as in this example, when we ask the pool itself to stop.
    let pool = Pool::new();
    pool.add(TickerService::new("ticker-fast", Duration::from_secs(1)));
    pool.add(TickerService::new("ticker-slow", Duration::from_secs(3)));

    // A pool is itself a service, so nesting works the same way as adding a leaf service.
    let nested_pool = Pool::new();
    nested_pool.add(TickerService::new("nested-ticker", Duration::from_secs(2)));
    pool.add(nested_pool);

    let pool_lifecycle = Lifecycle::new(Arc::new(pool));
    pool_lifecycle.on_state_change(|state: ServiceState| info!(%state, "Pool changed state."));

    let runner = {
        let lifecycle = pool_lifecycle.clone();
        tokio::spawn(async move { lifecycle.run().await })
    };

    let run_duration = Duration::from_secs(10);
    info!("Running pool for {:?} before shutting down...", run_duration);
    tokio::time::sleep(run_duration).await;

    info!("Requesting pool stop with a 5s graceful shutdown budget...");
    pool_lifecycle
        .stop(ShutdownContext::with_timeout(Duration::from_secs(5)))
        .await;

    match runner.await {
        Ok(result) => result.error_context("Pool exited uncleanly."),
        Err(e) => {
            error!("Pool task panicked: {}", e);
            Err(GenericError::from(e))
        }
    }
}

struct TickerService {
    service_name: &'static str,
    interval: Duration,
}

impl TickerService {
    fn new(service_name: &'static str, interval: Duration) -> Self {
        Self {
            service_name,
            interval,
        }
    }
}

#[async_trait]
impl warden_service::Service for TickerService {
    fn name(&self) -> &str {
        self.service_name
    }

    async fn run(&self, lifecycle: Lifecycle) -> Result<(), GenericError> {
        lifecycle.starting();

        let mut interval = tokio::time::interval(self.interval);
        lifecycle.running();

        let run_context = lifecycle.run_context();
        loop {
            select! {
                _ = interval.tick() => {
                    info!(service = self.service_name, "Tick.");
                },
                _ = run_context.cancelled() => {
                    let shutdown = lifecycle.stopping();
                    info!(service = self.service_name, deadline = ?shutdown.deadline(), "Cleaning up.");

                    // Pretend cleanup takes a little while, bounded by the shutdown budget.
                    select! {
                        _ = tokio::time::sleep(Duration::from_millis(500)) => {},
                        _ = shutdown.done() => {
                            info!(service = self.service_name, "Shutdown budget expired, aborting cleanup.");
                        },
                    }

                    lifecycle.stopped();
                    return Ok(());
                },
            }
        }
    }
}
