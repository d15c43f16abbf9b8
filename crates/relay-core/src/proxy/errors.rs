use crate::{cache::KeyError, upstream::errors::UpstreamError};

/// Reasons a request could not be answered with an upstream body.
///
/// Every variant except [`MethodNotAllowed`](Self::MethodNotAllowed) is reported
/// to the client as the generic internal-error envelope; the detail only reaches
/// the logs.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Body is not JSON, not an object, or has no string `method`.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// HTTP method other than `POST`.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Preserves concrete `UpstreamError` type for logging.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    /// Returns a static string representation for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::Upstream(e) => e.as_str(),
        }
    }
}

impl From<KeyError> for ProxyError {
    fn from(err: KeyError) -> Self {
        Self::MalformedRequest(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedRequest(format!("invalid JSON: {err}"))
    }
}
