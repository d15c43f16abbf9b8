use arc_swap::ArcSwapOption;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::{types::UpstreamReply, upstream::UpstreamError};

/// Timeouts and pooling for the shared upstream transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Total time allowed for one exchange, connect to last body byte.
    pub timeout: Duration,
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// How long an idle pooled connection is kept.
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 32,
        }
    }
}

/// Pooled HTTP transport shared by every upstream.
///
/// Requests are a single POST with no retries. Redirects are not followed.
/// [`close`](Self::close) drops the pooled client; forwards already in flight
/// keep their own handle and finish normally, later ones fail with
/// [`UpstreamError::TransportClosed`].
pub struct HttpClient {
    client: ArcSwapOption<Client>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Creates a new HTTP client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Creates a new HTTP client with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("rpc-relay/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                UpstreamError::ClientBuild(e.to_string())
            })?;

        Ok(Self { client: ArcSwapOption::from_pointee(client), config })
    }

    /// Sanitizes network errors to prevent information disclosure.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else {
            "network error".to_string()
        }
    }

    fn map_error(error: &reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::ConnectionFailed(Self::sanitize_network_error(error))
        }
    }

    /// POSTs `body` to `url` with `Content-Type: application/json` and returns
    /// whatever the upstream answered, including non-2xx replies.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::TransportClosed`] if [`close`](Self::close) was called
    /// - [`UpstreamError::Timeout`] if the exchange exceeds the configured timeout
    /// - [`UpstreamError::ConnectionFailed`] for every other transport failure
    pub async fn send_request(
        &self,
        url: &str,
        body: Bytes,
    ) -> Result<UpstreamReply, UpstreamError> {
        let client = self.client.load_full().ok_or(UpstreamError::TransportClosed)?;

        let response = client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let error = Self::sanitize_network_error(&e);
                tracing::debug!(error = %error, "upstream request failed");
                Self::map_error(&e)
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            tracing::debug!(status, "failed to read upstream response body");
            Self::map_error(&e)
        })?;

        tracing::trace!(status, body_len = body.len(), "http request completed");
        Ok(UpstreamReply { status, body })
    }

    /// Drops the pooled client. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let was_open = self.client.swap(None).is_some();
        if was_open {
            tracing::debug!("http transport closed");
        }
        was_open
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.client.load().is_none()
    }

    #[must_use]
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("closed", &self.is_closed())
            .field("config", &self.config)
            .finish()
    }
}
