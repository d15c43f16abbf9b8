//! Request correlation IDs.
//!
//! Every request gets an `x-request-id`: the client's value if it sent one,
//! otherwise a fresh UUID v4. The ID is stored in request extensions, copied to
//! the response, and recorded on the request's tracing span so upstream failures
//! logged deep inside the proxy can be tied back to a client call.

use axum::http::{header::HeaderValue, HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// The header name for request correlation IDs.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// A UUID v4 generator for request IDs.
/// Used with tower-http's request ID middleware.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestIdGenerator;

impl MakeRequestId for UuidRequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(HeaderValue::from_str(&id).ok()?))
    }
}

/// Returns the request ID set by [`create_request_id_layers`], if any.
#[must_use]
pub fn request_id_str<B>(request: &Request<B>) -> Option<&str> {
    request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
}

/// Span for `TraceLayer::make_span_with`, carrying method, path and request ID.
pub fn make_request_span<B>(request: &Request<B>) -> Span {
    tracing::info_span!(
        "rpc_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = request_id_str(request).unwrap_or("-"),
    )
}

/// Creates the request ID layer stack.
///
/// This returns a tuple of layers that should be applied to the router:
/// 1. `SetRequestIdLayer` - Sets X-Request-ID header if not present
/// 2. `PropagateRequestIdLayer` - Copies X-Request-ID from request to response
///
/// The set layer must be outermost so the trace span can see the ID.
pub fn create_request_id_layers() -> (
    tower_http::request_id::SetRequestIdLayer<UuidRequestIdGenerator>,
    tower_http::request_id::PropagateRequestIdLayer,
) {
    use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

    let set_layer = SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestIdGenerator);
    let propagate_layer = PropagateRequestIdLayer::new(X_REQUEST_ID.clone());

    (set_layer, propagate_layer)
}
