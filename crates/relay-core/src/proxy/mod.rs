//! Request dispatch: validate, consult the cache, forward on a miss.
//!
//! [`ProxyEngine::process_request`] takes the raw HTTP method and body and returns
//! either the bytes to send back with their [`CacheStatus`](crate::types::CacheStatus)
//! or a [`ProxyError`]. Mapping that error to an HTTP status and body is left to the
//! server crate.

pub mod engine;
pub mod errors;

pub use engine::{ForwardedReply, ProxyEngine, SharedContext, ALLOWED_HTTP_METHOD};
pub use errors::ProxyError;
