use thiserror::Error;

/// Errors that can occur while forwarding a request to an upstream.
///
/// An upstream that answers with a non-2xx status is not an error here; that
/// reply is relayed as-is. These variants cover the cases where no reply
/// arrived at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// The upstream could not be reached or the exchange broke off.
    ///
    /// The message is sanitized and never carries the upstream URL.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport was closed during shutdown.
    #[error("HTTP transport is closed")]
    TransportClosed,

    /// The upstream list is empty.
    #[error("No upstreams configured")]
    NoUpstreams,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl UpstreamError {
    /// Returns a static string representation for log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::TransportClosed => "transport_closed",
            Self::NoUpstreams => "no_upstreams",
            Self::ClientBuild(_) => "client_build",
        }
    }
}
