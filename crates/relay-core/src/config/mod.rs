//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: set on the builder in [`AppConfig::from_file`]
//! 2. **Config file**: TOML file named by the `RELAY_CONFIG` env var
//! 3. **Environment variables**: `RELAY__SECTION__FIELD` overrides one field
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: listener, worker threads, concurrency and body limits
//! - [`UpstreamsConfig`]: RPC endpoints in rotation order, transport timeouts
//! - [`CacheConfig`]: entry bound, TTL, whether error replies are cached
//! - [`ShutdownConfig`]: drain grace period and forced-stop timeout
//! - [`LoggingConfig`]: log level and format
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_port = 8080
//! max_concurrent_requests = 10
//!
//! [[upstreams.providers]]
//! name = "primary"
//! url = "https://rpc-one.example.com"
//!
//! [[upstreams.providers]]
//! name = "secondary"
//! url = "https://rpc-two.example.com"
//!
//! [cache]
//! max_entries = 1000
//! ttl_ms = 1000
//! ```

use crate::{cache::ResponseCacheConfig, types::UpstreamConfig, upstream::HttpClientConfig};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `0.0.0.0`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `8080`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum number of requests processed at once; the rest wait. Defaults to `10`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Tokio worker threads. Defaults to `10`.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Largest accepted request body in bytes. Defaults to 1 MiB.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_worker_threads() -> usize {
    10
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// One upstream RPC endpoint as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpstreamProvider {
    /// Label used in logs and statistics.
    pub name: String,

    /// HTTP(S) URL requests are POSTed to.
    pub url: String,
}

/// Upstream endpoints and transport timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamsConfig {
    /// Endpoints in rotation order. The first request goes to the first entry.
    #[serde(default)]
    pub providers: Vec<UpstreamProvider>,

    /// Total time allowed for one upstream exchange. Defaults to `30`.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Time allowed to connect to an upstream. Defaults to `5`.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

/// Response cache sizing and policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached responses. Defaults to `1000`.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Lifetime of a cached response in milliseconds. Defaults to `1000`.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Cache upstream replies with a non-2xx status or a JSON-RPC `error` member.
    /// Defaults to `true`.
    #[serde(default = "default_cache_error_responses")]
    pub cache_error_responses: bool,
}

fn default_max_entries() -> usize {
    1000
}

fn default_ttl_ms() -> u64 {
    1000
}

fn default_cache_error_responses() -> bool {
    true
}

/// Graceful shutdown timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// How long in-flight requests may run after shutdown begins. Defaults to `10`.
    #[serde(default = "default_grace_period_seconds")]
    pub grace_period_seconds: u64,

    /// How long to wait for the server to unwind once it has been aborted. Defaults to `5`.
    #[serde(default = "default_force_timeout_seconds")]
    pub force_timeout_seconds: u64,
}

fn default_grace_period_seconds() -> u64 {
    10
}

fn default_force_timeout_seconds() -> u64 {
    5
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstreams: UpstreamsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub shutdown: ShutdownConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
            worker_threads: default_worker_threads(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                UpstreamProvider {
                    name: "optimism-primary".to_string(),
                    url: "https://mainnet.optimism.io".to_string(),
                },
                UpstreamProvider {
                    name: "optimism-secondary".to_string(),
                    url: "https://optimism-rpc.publicnode.com".to_string(),
                },
            ],
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_ms: default_ttl_ms(),
            cache_error_responses: default_cache_error_responses(),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_seconds: default_grace_period_seconds(),
            force_timeout_seconds: default_force_timeout_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstreams: UpstreamsConfig::default(),
            cache: CacheConfig::default(),
            shutdown: ShutdownConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `RELAY__` prefix can override any scalar value.
    /// Use `__` as a separator for nested fields (e.g., `RELAY__SERVER__BIND_PORT=9000`).
    /// A missing file is not an error; the defaults apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let config_builder = Config::builder()
            .set_default("server.bind_address", defaults.server.bind_address)?
            .set_default("server.bind_port", i64::from(defaults.server.bind_port))?
            .set_default(
                "server.max_concurrent_requests",
                as_i64(defaults.server.max_concurrent_requests),
            )?
            .set_default("server.worker_threads", as_i64(defaults.server.worker_threads))?
            .set_default("server.max_body_bytes", as_i64(defaults.server.max_body_bytes))?
            .set_default("upstreams.timeout_seconds", as_i64(defaults.upstreams.timeout_seconds))?
            .set_default(
                "upstreams.connect_timeout_seconds",
                as_i64(defaults.upstreams.connect_timeout_seconds),
            )?
            .set_default("cache.max_entries", as_i64(defaults.cache.max_entries))?
            .set_default("cache.ttl_ms", as_i64(defaults.cache.ttl_ms))?
            .set_default("cache.cache_error_responses", defaults.cache.cache_error_responses)?
            .set_default(
                "shutdown.grace_period_seconds",
                as_i64(defaults.shutdown.grace_period_seconds),
            )?
            .set_default(
                "shutdown.force_timeout_seconds",
                as_i64(defaults.shutdown.force_timeout_seconds),
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("RELAY").separator("__"))
            .build()?;

        let mut config: AppConfig = config_builder.try_deserialize()?;
        if config.upstreams.providers.is_empty() {
            config.upstreams.providers = defaults.upstreams.providers;
        }
        Ok(config)
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `RELAY_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&config_path)
    }

    /// Returns the upstream providers in rotation order.
    #[must_use]
    pub fn upstreams(&self) -> Vec<UpstreamConfig> {
        self.upstreams
            .providers
            .iter()
            .map(|p| UpstreamConfig::new(&p.name, p.url.clone()))
            .collect()
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed into a valid [`SocketAddr`].
    ///
    /// [`SocketAddr`]: std::net::SocketAddr
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }

    #[must_use]
    pub fn response_cache_config(&self) -> ResponseCacheConfig {
        ResponseCacheConfig { max_entries: self.cache.max_entries, ttl: self.cache_ttl() }
    }

    #[must_use]
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.upstreams.timeout_seconds),
            connect_timeout: Duration::from_secs(self.upstreams.connect_timeout_seconds),
            ..HttpClientConfig::default()
        }
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown.grace_period_seconds)
    }

    #[must_use]
    pub fn force_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown.force_timeout_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// Checks include:
    /// - At least one upstream provider is configured, each with an `http(s)` URL
    /// - Cache capacity, TTL and transport timeouts are greater than zero
    /// - Server limits and port are greater than zero
    /// - Logging format is either `"json"` or `"pretty"`
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.upstreams.providers.is_empty() {
            return Err("No upstream RPC endpoints configured".to_string());
        }

        for provider in &self.upstreams.providers {
            if provider.url.is_empty() {
                return Err(format!("Empty URL for upstream: {}", provider.name));
            }
            if !provider.url.starts_with("http://") && !provider.url.starts_with("https://") {
                return Err(format!(
                    "Invalid URL for upstream {}: must start with http:// or https://",
                    provider.name
                ));
            }
        }

        if self.upstreams.timeout_seconds == 0 {
            return Err("Upstream timeout must be greater than 0".to_string());
        }

        if self.upstreams.connect_timeout_seconds == 0 {
            return Err("Upstream connect timeout must be greater than 0".to_string());
        }

        if self.cache.max_entries == 0 {
            return Err("Cache max entries must be greater than 0".to_string());
        }

        if self.cache.ttl_ms == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if self.server.worker_threads == 0 {
            return Err("Worker threads must be greater than 0".to_string());
        }

        if self.server.max_body_bytes == 0 {
            return Err("Max body bytes must be greater than 0".to_string());
        }

        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        self.socket_addr()?;

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}

fn as_i64<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}
