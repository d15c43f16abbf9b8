//! Runtime lifecycle: state tracking, shutdown signalling, and draining.

use crate::{
    cache::ResponseCache,
    config::AppConfig,
    proxy::ProxyEngine,
    upstream::{HttpClient, LoadBalancer},
};
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{builder::RelayRuntimeBuilder, RelayComponents};

/// Observable phase of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Components are built; the listener is not serving yet.
    Starting,
    /// Accepting and dispatching requests.
    Running,
    /// No longer accepting; waiting for in-flight requests.
    Draining,
    /// All resources released.
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// How the serving task ended during [`RelayRuntime::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The server finished within the grace period.
    Graceful,
    /// The grace period elapsed; the server was aborted and unwound in time.
    Forced,
    /// The server did not unwind within the force timeout either.
    Abandoned,
    /// Another caller already drained, or is draining, the runtime.
    AlreadyDraining,
}

/// Main runtime container owning the components and their shutdown sequence.
///
/// Shutdown is announced on a broadcast channel that the HTTP server waits on, and
/// the current [`LifecycleState`] is published through a `watch` channel. Draining
/// happens at most once; later calls return [`DrainOutcome::AlreadyDraining`].
pub struct RelayRuntime {
    components: RelayComponents,
    shutdown_tx: broadcast::Sender<()>,
    state_tx: watch::Sender<LifecycleState>,
    config: AppConfig,
    shutdown_initiated: Arc<AtomicBool>,
}

impl RelayRuntime {
    /// Creates a new builder for constructing a `RelayRuntime`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let runtime = RelayRuntime::builder().with_config(config).build()?;
    /// ```
    #[must_use]
    pub fn builder() -> RelayRuntimeBuilder {
        RelayRuntimeBuilder::new()
    }

    pub(super) fn new(
        components: RelayComponents,
        shutdown_tx: broadcast::Sender<()>,
        config: AppConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Starting);
        Self {
            components,
            shutdown_tx,
            state_tx,
            config,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn components(&self) -> &RelayComponents {
        &self.components
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Convenience accessor for the proxy engine.
    #[must_use]
    pub fn proxy_engine(&self) -> &Arc<ProxyEngine> {
        self.components.proxy_engine()
    }

    #[must_use]
    pub fn response_cache(&self) -> &Arc<ResponseCache> {
        self.components.response_cache()
    }

    #[must_use]
    pub fn load_balancer(&self) -> &Arc<LoadBalancer> {
        self.components.load_balancer()
    }

    #[must_use]
    pub fn http_client(&self) -> &Arc<HttpClient> {
        self.components.http_client()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state_tx.borrow()
    }

    /// Returns a receiver that observes every state transition.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Moves `Starting` to `Running`. Returns `false` from any other state.
    pub fn mark_running(&self) -> bool {
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == LifecycleState::Starting {
                *state = LifecycleState::Running;
                true
            } else {
                false
            }
        });
        if changed {
            debug!("Relay runtime running");
        }
        changed
    }

    /// Announces shutdown to every [`shutdown_requested`](Self::shutdown_requested) waiter.
    ///
    /// Returns `false` if shutdown had already been triggered.
    pub fn trigger_shutdown(&self) -> bool {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Shutdown already triggered, ignoring duplicate call");
            return false;
        }

        info!("Shutdown triggered");
        if self.shutdown_tx.send(()).is_err() {
            debug!("Shutdown signal had no receivers");
        }
        true
    }

    #[must_use]
    pub fn is_shutdown_triggered(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Returns a future that resolves once shutdown has been triggered.
    ///
    /// Resolves immediately if it already was. Suitable for
    /// `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn shutdown_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let initiated = Arc::clone(&self.shutdown_initiated);
        async move {
            if initiated.load(Ordering::SeqCst) {
                return;
            }
            let _ = shutdown_rx.recv().await;
        }
    }

    /// Stops the runtime without a serving task, e.g. for embedded use.
    pub async fn shutdown(&self) -> DrainOutcome {
        self.drain(None).await
    }

    /// Runs the shutdown sequence.
    ///
    /// 1. trigger shutdown so the server stops accepting
    /// 2. enter `Draining`
    /// 3. invalidate the response cache
    /// 4. close the upstream transport
    /// 5. wait up to the grace period for `server` to finish, abort it if it does not,
    ///    then wait up to the force timeout for it to unwind
    /// 6. log a summary and enter `Stopped`
    pub async fn drain(&self, server: Option<JoinHandle<()>>) -> DrainOutcome {
        self.trigger_shutdown();

        let entered = self.state_tx.send_if_modified(|state| match state {
            LifecycleState::Starting | LifecycleState::Running => {
                *state = LifecycleState::Draining;
                true
            }
            LifecycleState::Draining | LifecycleState::Stopped => false,
        });
        if !entered {
            warn!(state = %self.state(), "Drain already in progress or complete, ignoring");
            return DrainOutcome::AlreadyDraining;
        }

        info!("Draining relay runtime");

        self.components.response_cache().invalidate_all();
        self.components.http_client().close();

        let outcome = match server {
            Some(handle) => {
                Self::await_server(handle, self.config.grace_period(), self.config.force_timeout())
                    .await
            }
            None => DrainOutcome::Graceful,
        };

        self.log_summary();
        self.state_tx.send_replace(LifecycleState::Stopped);
        info!(outcome = ?outcome, "Relay runtime stopped");

        outcome
    }

    async fn await_server(
        mut handle: JoinHandle<()>,
        grace_period: Duration,
        force_timeout: Duration,
    ) -> DrainOutcome {
        if let Ok(result) = tokio::time::timeout(grace_period, &mut handle).await {
            if let Err(e) = result {
                error!(error = %e, "Server task failed during drain");
            }
            return DrainOutcome::Graceful;
        }

        warn!(
            grace_period_secs = grace_period.as_secs(),
            "Grace period elapsed with requests in flight, forcing shutdown"
        );
        handle.abort();

        match tokio::time::timeout(force_timeout, &mut handle).await {
            Ok(_) => DrainOutcome::Forced,
            Err(_) => {
                error!(
                    force_timeout_secs = force_timeout.as_secs(),
                    "Server task did not terminate after abort"
                );
                DrainOutcome::Abandoned
            }
        }
    }

    fn log_summary(&self) {
        let cache = self.components.response_cache().stats();
        info!(
            hits = cache.hits,
            misses = cache.misses,
            expirations = cache.expirations,
            insertions = cache.insertions,
            evictions = cache.evictions,
            "Response cache summary"
        );

        for upstream in self.components.load_balancer().get_stats().upstreams {
            info!(
                upstream = %upstream.name,
                selections = upstream.selections,
                replies = upstream.replies,
                error_replies = upstream.error_replies,
                failures = upstream.failures,
                "Upstream summary"
            );
        }
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    let _ = assert_send::<RelayRuntime>;
    let _ = assert_sync::<RelayRuntime>;
};
