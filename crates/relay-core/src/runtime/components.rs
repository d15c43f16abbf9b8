//! Core component container for the relay runtime.

use crate::{
    cache::ResponseCache,
    proxy::ProxyEngine,
    upstream::{HttpClient, LoadBalancer},
};
use std::sync::Arc;

/// Container for all initialized relay components.
///
/// Each component is built once at startup and shared through `Arc`. The proxy
/// engine holds the same instances, so shutting down through these handles
/// affects request processing directly.
#[derive(Clone)]
pub struct RelayComponents {
    response_cache: Arc<ResponseCache>,
    load_balancer: Arc<LoadBalancer>,
    http_client: Arc<HttpClient>,
    proxy_engine: Arc<ProxyEngine>,
}

impl RelayComponents {
    /// Creates a new components container.
    ///
    /// Called by `RelayRuntimeBuilder` during initialization.
    #[must_use]
    pub fn new(
        response_cache: Arc<ResponseCache>,
        load_balancer: Arc<LoadBalancer>,
        http_client: Arc<HttpClient>,
        proxy_engine: Arc<ProxyEngine>,
    ) -> Self {
        Self { response_cache, load_balancer, http_client, proxy_engine }
    }

    #[must_use]
    pub fn response_cache(&self) -> &Arc<ResponseCache> {
        &self.response_cache
    }

    #[must_use]
    pub fn load_balancer(&self) -> &Arc<LoadBalancer> {
        &self.load_balancer
    }

    #[must_use]
    pub fn http_client(&self) -> &Arc<HttpClient> {
        &self.http_client
    }

    #[must_use]
    pub fn proxy_engine(&self) -> &Arc<ProxyEngine> {
        &self.proxy_engine
    }
}
