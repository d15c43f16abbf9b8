//! HTTP middleware components for the relay server.

pub mod correlation_id;
pub mod method_guard;

pub use correlation_id::{
    create_request_id_layers, make_request_span, request_id_str, UuidRequestIdGenerator,
    X_REQUEST_ID,
};
pub use method_guard::require_post;
