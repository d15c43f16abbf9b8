use anyhow::{Context, Result};
use relay_core::{config::AppConfig, runtime::RelayRuntime};
use rustls::crypto::{ring::default_provider, CryptoProvider};
use server::app;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` wins when set; otherwise the workspace crates log at
/// `logging.level` and everything else at `warn`.
fn init_logging(config: &AppConfig) {
    let level = config.logging.level.as_str();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,relay_core={level},server={level}")));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

fn main() -> Result<()> {
    CryptoProvider::install_default(default_provider())
        .map_err(|e| anyhow::anyhow!("Failed to install crypto provider: {e:?}"))?;

    let config = AppConfig::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);

    let worker_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.worker_threads)
        .thread_name("relay-worker")
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    worker_runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    info!("Starting JSON-RPC relay");
    debug!(
        upstreams_count = config.upstreams.providers.len(),
        worker_threads = config.server.worker_threads,
        cache_ttl_ms = config.cache.ttl_ms,
        bind_port = config.server.bind_port,
        "Configuration loaded"
    );

    let addr = config.socket_addr().map_err(anyhow::Error::msg)?;
    let runtime = Arc::new(RelayRuntime::builder().with_config(config).build()?);

    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;

    let outcome = app::serve(runtime, listener, shutdown_signal()).await?;
    info!(outcome = ?outcome, "Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(
                error = %e,
                "Failed to install Ctrl+C handler"
            );
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(
                    error = %e,
                    "Failed to install signal handler"
                );

                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
