//! Upstream RPC endpoints, selection, and transport.
//!
//! - [`LoadBalancer`] picks the next upstream in strict round-robin order.
//! - [`UpstreamEndpoint`] describes one upstream and counts what happened to it.
//! - [`HttpClient`] is the single pooled transport every forward goes through.
//!
//! There is no health checking, retry, or failover: a forward goes to exactly one
//! upstream and its outcome, good or bad, is what the client sees.

pub mod endpoint;
pub mod errors;
pub mod http_client;
pub mod load_balancer;

pub use endpoint::{EndpointStats, UpstreamEndpoint};
pub use errors::UpstreamError;
pub use http_client::{HttpClient, HttpClientConfig};
pub use load_balancer::{LoadBalancer, LoadBalancerStats};
