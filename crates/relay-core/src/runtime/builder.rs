//! Builder for initializing the relay runtime.

use crate::{
    cache::ResponseCache,
    config::AppConfig,
    proxy::ProxyEngine,
    upstream::{HttpClient, LoadBalancer},
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{lifecycle::RelayRuntime, RelayComponents};

/// Errors that can occur during runtime initialization.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// A component could not be constructed
    #[error("Runtime initialization failed: {0}")]
    Initialization(String),
}

/// Builder for constructing a [`RelayRuntime`].
///
/// # Examples
///
/// ```no_run
/// # use relay_core::{config::AppConfig, runtime::RelayRuntimeBuilder};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::load()?;
///
/// let runtime = RelayRuntimeBuilder::new().with_config(config).build()?;
/// let engine = runtime.proxy_engine();
/// # Ok(())
/// # }
/// ```
pub struct RelayRuntimeBuilder {
    config: Option<AppConfig>,
}

/// Shutdown is announced once; a few slots leave room for late subscribers.
const SHUTDOWN_CHANNEL_CAPACITY: usize = 16;

impl Default for RelayRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { config: None }
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validates the configuration and builds every component.
    ///
    /// The returned runtime is in the `Starting` state; nothing is listening yet.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError` if configuration is missing or invalid (including an
    /// empty upstream list), or a component fails to build.
    pub fn build(self) -> Result<RelayRuntime, RuntimeError> {
        let config = self.config.ok_or_else(|| {
            RuntimeError::ConfigValidation("No configuration provided".to_string())
        })?;

        config.validate().map_err(RuntimeError::ConfigValidation)?;

        info!(
            upstreams_count = config.upstreams.providers.len(),
            cache_max_entries = config.cache.max_entries,
            cache_ttl_ms = config.cache.ttl_ms,
            cache_error_responses = config.cache.cache_error_responses,
            "Initializing relay runtime"
        );

        let (shutdown_tx, _) = broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY);

        let response_cache = Arc::new(
            ResponseCache::new(&config.response_cache_config())
                .map_err(|e| RuntimeError::Initialization(format!("Response cache: {e}")))?,
        );
        debug!("Response cache initialized");

        let load_balancer = Arc::new(
            LoadBalancer::new(config.upstreams())
                .map_err(|e| RuntimeError::Initialization(format!("Load balancer: {e}")))?,
        );
        for endpoint in load_balancer.endpoints() {
            debug!(upstream = %endpoint.name(), "Upstream registered");
        }

        let http_client = Arc::new(
            HttpClient::with_config(config.http_client_config())
                .map_err(|e| RuntimeError::Initialization(format!("HTTP client: {e}")))?,
        );
        debug!("HTTP client initialized");

        let proxy_engine = Arc::new(ProxyEngine::new(
            Arc::clone(&response_cache),
            Arc::clone(&load_balancer),
            Arc::clone(&http_client),
            config.cache.cache_error_responses,
        ));
        debug!("Proxy engine initialized");

        let components =
            RelayComponents::new(response_cache, load_balancer, http_client, proxy_engine);

        Ok(RelayRuntime::new(components, shutdown_tx, config))
    }
}
