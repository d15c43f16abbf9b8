//! # Relay Core
//!
//! Core library for Relay, a caching reverse proxy for JSON-RPC.
//!
//! Relay accepts JSON-RPC requests over HTTP, answers repeated identical
//! requests from a short-lived cache, and otherwise forwards the raw request
//! to one of several interchangeable upstream endpoints chosen round-robin.
//!
//! - **[`cache`]**: Bounded, time-expiring response cache and cache-key derivation.
//! - **[`upstream`]**: Round-robin endpoint selection and the outbound HTTP client.
//! - **[`proxy`]**: Per-request dispatch (parse, key, cache check, forward, populate).
//! - **[`runtime`]**: Component wiring and the start/drain/stop lifecycle.
//! - **[`config`]**: Layered configuration (defaults, TOML file, environment).
//!
//! ## Request Flow
//!
//! ```text
//! Client POST
//!       │
//!       ▼
//! ┌─────────────┐
//! │ ProxyEngine │ ─── not POST ──► 405
//! └──────┬──────┘
//!        │ parse + derive key ─── malformed ──► 500 envelope
//!        ▼
//! ┌───────────────┐
//! │ ResponseCache │ ─── hit ──► cached body
//! └──────┬────────┘
//!        │ miss
//!        ▼
//! ┌──────────────┐     ┌────────────┐
//! │ LoadBalancer │ ──► │ HttpClient │ ─── unreachable ──► 500 envelope
//! └──────────────┘     └─────┬──────┘
//!                            │ raw upstream body
//!                            ▼
//!                     store in cache ──► body to client
//! ```

pub mod cache;
pub mod config;
pub mod proxy;
pub mod runtime;
pub mod types;
pub mod upstream;
pub mod utils;
