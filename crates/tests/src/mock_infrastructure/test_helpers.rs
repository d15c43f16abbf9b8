//! Test Helper Functions and Utilities
//!
//! Builders for configs, engines and runtimes pointed at mock upstreams.

use relay_core::{
    config::{AppConfig, UpstreamProvider},
    proxy::ProxyEngine,
    runtime::RelayRuntime,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Port 1 on loopback: connecting fails immediately.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

/// Builds a config with one provider per URL, named `upstream-0`, `upstream-1`, ...
///
/// Timeouts are short so unreachable upstreams fail fast, and the listener binds an
/// ephemeral loopback port.
#[must_use]
pub fn test_config<S: AsRef<str>>(urls: &[S]) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.bind_port = 0;
    config.upstreams.providers = urls
        .iter()
        .enumerate()
        .map(|(i, url)| UpstreamProvider {
            name: format!("upstream-{i}"),
            url: url.as_ref().to_string(),
        })
        .collect();
    config.upstreams.timeout_seconds = 5;
    config.upstreams.connect_timeout_seconds = 2;
    config.shutdown.grace_period_seconds = 2;
    config.shutdown.force_timeout_seconds = 1;
    config
}

/// Builds a runtime from `config`.
///
/// `bind_port = 0` is rejected by validation, so the port is set to a placeholder
/// here; tests bind their own listener.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
#[must_use]
pub fn runtime_for_config(mut config: AppConfig) -> Arc<RelayRuntime> {
    if config.server.bind_port == 0 {
        config.server.bind_port = 8080;
    }
    Arc::new(RelayRuntime::builder().with_config(config).build().expect("build runtime"))
}

/// Builds a runtime with default cache settings over `urls`.
#[must_use]
pub fn runtime_for<S: AsRef<str>>(urls: &[S]) -> Arc<RelayRuntime> {
    runtime_for_config(test_config(urls))
}

/// Returns the proxy engine of a fresh runtime over `urls`.
#[must_use]
pub fn engine_for<S: AsRef<str>>(urls: &[S]) -> Arc<ProxyEngine> {
    Arc::clone(runtime_for(urls).proxy_engine())
}

/// Serializes a JSON-RPC 2.0 request.
#[must_use]
pub fn rpc_request(id: u64, method: &str, params: &Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

/// Parses a response body.
///
/// # Panics
///
/// Panics if the body is not JSON.
#[must_use]
pub fn parse_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("response body should be JSON")
}
