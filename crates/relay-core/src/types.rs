//! Shared type definitions for upstream configuration and proxy responses.
//!
//! The proxy never models JSON-RPC requests or responses as typed structs: the
//! request body is parsed into a [`serde_json::Value`] only to derive a cache key,
//! and upstream responses travel as raw bytes. The types here describe what the
//! proxy itself produces around those bytes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JSON-RPC error code for an internal error.
pub const INTERNAL_ERROR_CODE: i32 = -32603;

/// Body returned to clients for every processing failure.
///
/// The cause is never exposed; it is logged at the boundary instead.
pub const INTERNAL_ERROR_ENVELOPE: &str = r#"{"error":{"code":-32603,"message":"Internal error"}}"#;

/// Plain-text body returned for anything other than `POST`.
pub const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed";

/// Describes whether a response was served from cache or fetched upstream.
///
/// Exposed to clients through the `x-cache-status` header.
///
/// # Example
///
/// ```
/// use relay_core::types::CacheStatus;
///
/// assert_eq!(CacheStatus::Hit.to_string(), "HIT");
/// assert_eq!(CacheStatus::Miss.to_string(), "MISS");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheStatus {
    /// A live cache entry answered the request; no upstream call was made.
    Hit,
    /// The request was forwarded to an upstream.
    Miss,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheStatus::Hit => write!(f, "HIT"),
            CacheStatus::Miss => write!(f, "MISS"),
        }
    }
}

/// Static description of one upstream RPC endpoint.
///
/// `name` is only used for logs and statistics; `url` is the POST target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub name: Arc<str>,
    pub url: String,
}

impl UpstreamConfig {
    #[must_use]
    pub fn new(name: &str, url: impl Into<String>) -> Self {
        Self { name: Arc::from(name), url: url.into() }
    }
}

/// Raw reply received from an upstream.
///
/// A non-2xx status is not a transport failure: the body is relayed to the
/// client verbatim, exactly like a success.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Bytes,
}

impl UpstreamReply {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    /// Returns `true` for HTTP 2xx replies.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `true` if the body is a JSON object with a top-level `error` member.
    #[must_use]
    pub fn has_rpc_error(&self) -> bool {
        serde_json::from_slice::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|value| value.as_object().map(|object| object.contains_key("error")))
            .unwrap_or(false)
    }

    /// Returns `true` if the upstream answered, but with an error of some kind.
    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.is_success() || self.has_rpc_error()
    }
}

/// Outcome of a successfully dispatched request.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    /// Upstream body, verbatim.
    pub body: Bytes,
    pub cache_status: CacheStatus,
    /// Name of the upstream that produced the body; `None` on a cache hit.
    pub serving_upstream: Option<Arc<str>>,
}
