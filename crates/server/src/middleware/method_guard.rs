//! Rejects non-POST requests before anything reads the body.
//!
//! Sits outside the body limit, so a `GET` with an oversized body is answered
//! `405` rather than `413`.

use axum::{extract::Request, middleware::Next, response::Response};
use relay_core::proxy::{ProxyError, ALLOWED_HTTP_METHOD};

use crate::router::error_response;

/// `axum::middleware::from_fn` guard answering `405` for every method but `POST`.
pub async fn require_post(request: Request, next: Next) -> Response {
    if request.method().as_str() != ALLOWED_HTTP_METHOD {
        return error_response(&ProxyError::MethodNotAllowed(request.method().to_string()));
    }
    next.run(request).await
}
