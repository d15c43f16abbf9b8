//! Relay runtime initialization and lifecycle management.
//!
//! The runtime owns the components built from an [`AppConfig`](crate::config::AppConfig)
//! and the shutdown sequence that releases them. The HTTP server lives in a separate
//! crate and only needs the proxy engine plus the shutdown future.
//!
//! ```text
//!  Starting ──mark_running──► Running ──drain──► Draining ──► Stopped
//! ```
//!
//! # Example
//!
//! ```no_run
//! use relay_core::{config::AppConfig, runtime::RelayRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let runtime = RelayRuntime::builder().with_config(config).build()?;
//!
//!     let engine = runtime.proxy_engine();
//!     let body = bytes::Bytes::from_static(br#"{"jsonrpc":"2.0","id":1,"method":"eth_chainId"}"#);
//!     let _ = engine.process_request("POST", body).await;
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod components;
pub mod lifecycle;

pub use builder::{RelayRuntimeBuilder, RuntimeError};
pub use components::RelayComponents;
pub use lifecycle::{DrainOutcome, LifecycleState, RelayRuntime};
