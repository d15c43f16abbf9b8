use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use relay_core::{
    proxy::{ProxyEngine, ProxyError},
    types::{INTERNAL_ERROR_ENVELOPE, METHOD_NOT_ALLOWED_BODY},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Response header reporting whether the body came from the cache.
pub const X_CACHE_STATUS: &str = "x-cache-status";

const APPLICATION_JSON: &str = "application/json";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Handles every request regardless of path.
///
/// The status line is decided here and nowhere else:
/// - `200` with the upstream or cached body, verbatim
/// - `405` with a plain-text body for anything but `POST`
/// - `500` with the fixed JSON-RPC internal-error envelope for every other failure
pub async fn handle_rpc(
    State(proxy_engine): State<Arc<ProxyEngine>>,
    method: Method,
    body: Bytes,
) -> Response {
    match proxy_engine.process_request(method.as_str(), body).await {
        Ok(response) => {
            debug!(
                cache_status = %response.cache_status,
                upstream = response.serving_upstream.as_deref().unwrap_or("cache"),
                body_len = response.body.len(),
                "request served"
            );
            (
                StatusCode::OK,
                [
                    ("content-type", APPLICATION_JSON.to_string()),
                    (X_CACHE_STATUS, response.cache_status.to_string()),
                ],
                response.body,
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Maps a dispatch failure to its HTTP response, logging the cause.
///
/// The cause never reaches the client.
#[must_use]
pub fn error_response(error: &ProxyError) -> Response {
    match error {
        ProxyError::MethodNotAllowed(method) => {
            debug!(method = %method, "rejected non-POST request");
            (
                StatusCode::METHOD_NOT_ALLOWED,
                [("content-type", TEXT_PLAIN), ("allow", "POST")],
                METHOD_NOT_ALLOWED_BODY,
            )
                .into_response()
        }
        ProxyError::MalformedRequest(_) | ProxyError::Upstream(_) => {
            warn!(error = %error, kind = error.kind(), "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", APPLICATION_JSON)],
                INTERNAL_ERROR_ENVELOPE,
            )
                .into_response()
        }
    }
}
