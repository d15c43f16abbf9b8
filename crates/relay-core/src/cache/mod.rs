//! Response caching for JSON-RPC requests.
//!
//! # Architecture
//!
//! ```text
//! request body ──► derive_cache_key ──► CacheKey (method, canonical params)
//!                                           │
//!                                           ▼
//!                           ┌──────────────────────────────┐
//!                           │        ResponseCache         │
//!                           │  Mutex<LruCache<key, entry>> │
//!                           │  • max_entries (LRU evict)   │
//!                           │  • ttl (checked on lookup)   │
//!                           └──────────────────────────────┘
//! ```
//!
//! Entries hold the raw upstream body as [`bytes::Bytes`], so a hit costs one
//! reference-count increment and the client receives the exact bytes the upstream
//! sent.

pub mod key;
mod response_cache;

pub use key::{derive_cache_key, CacheKey, KeyError};
pub use response_cache::{CacheError, CacheStats, ResponseCache, ResponseCacheConfig};
