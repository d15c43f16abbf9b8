//! Router assembly and the serve-then-drain loop.

use axum::{body::Body, extract::DefaultBodyLimit, middleware::from_fn, Router};
use relay_core::{
    config::ServerConfig,
    proxy::ProxyEngine,
    runtime::{DrainOutcome, RelayRuntime},
};
use std::{future::Future, sync::Arc};
use tokio::{net::TcpListener, task::JoinHandle};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use crate::{
    middleware::{create_request_id_layers, make_request_span, require_post},
    router,
};

/// Builds the HTTP application.
///
/// Every path reaches [`router::handle_rpc`]. Outermost to innermost: request ID,
/// response ID propagation, tracing span, concurrency cap, POST guard, body limit.
/// Requests over the concurrency cap wait for a slot rather than being rejected.
pub fn create_app(proxy_engine: Arc<ProxyEngine>, server: &ServerConfig) -> Router {
    // Layers are applied in reverse order, so propagate runs after set
    let (set_request_id, propagate_request_id) = create_request_id_layers();

    Router::new()
        .fallback(router::handle_rpc)
        .with_state(proxy_engine)
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(from_fn(require_post))
        .layer(GlobalConcurrencyLimitLayer::new(server.max_concurrent_requests))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(propagate_request_id)
        .layer(set_request_id)
}

/// Serves `listener` until `signal` resolves or shutdown is triggered on the
/// runtime, then drains the runtime.
///
/// Marks the runtime `Running` once the server task is spawned and returns only
/// after it has reached `Stopped`.
///
/// # Errors
///
/// Returns an I/O error if the listener's local address cannot be read.
pub async fn serve<F>(
    runtime: Arc<RelayRuntime>,
    listener: TcpListener,
    signal: F,
) -> std::io::Result<DrainOutcome>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    let app = create_app(Arc::clone(runtime.proxy_engine()), &runtime.config().server);

    let stop_accepting = runtime.shutdown_requested();
    let server_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(stop_accepting).await {
            error!(error = %e, "Server error occurred");
        }
    });

    runtime.mark_running();
    info!(
        address = %local_addr,
        upstreams_count = runtime.load_balancer().len(),
        max_concurrent_requests = runtime.config().server.max_concurrent_requests,
        "Server started"
    );

    Ok(supervise(&runtime, server_task, signal).await)
}

/// Waits for `signal`, a programmatic trigger, or the server task ending on its
/// own, then drains the runtime.
async fn supervise<F>(
    runtime: &RelayRuntime,
    mut server_task: JoinHandle<()>,
    signal: F,
) -> DrainOutcome
where
    F: Future<Output = ()>,
{
    let server_exited = tokio::select! {
        () = signal => {
            info!("Shutdown signal received, starting graceful shutdown");
            false
        }
        () = runtime.shutdown_requested() => {
            debug!("Shutdown triggered programmatically");
            false
        }
        result = &mut server_task => {
            match result {
                Ok(()) => error!("Server stopped unexpectedly, shutting down"),
                Err(e) => error!(error = %e, "Server task failed, shutting down"),
            }
            true
        }
    };

    // A finished JoinHandle must not be polled again.
    let server_task = if server_exited { None } else { Some(server_task) };
    runtime.drain(server_task).await
}
