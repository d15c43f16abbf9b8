//! HTTP layer for the relay proxy.
//!
//! - [`router`]: the single catch-all handler and its status/body mapping
//! - [`app`]: router assembly with tower layers, and the serve/drain loop
//! - [`middleware`]: request correlation IDs and per-request tracing spans

pub mod app;
pub mod middleware;
pub mod router;
