//! Cache-key derivation for JSON-RPC requests.
//!
//! A key is `method`, a `-` separator, then the canonical text of `params`. Only
//! `method` and `params` take part; `id` and `jsonrpc` are ignored so that two
//! clients asking the same question share an entry.
//!
//! A missing `params` member renders as the empty string, an explicit `null`
//! renders as `null`, so `{"method":"m"}` and `{"method":"m","params":null}` get
//! different keys.
//!
//! The key compares as the `(method, params)` pair rather than as the joined text,
//! because the joined text is ambiguous when the method itself contains the
//! separator (`"m"` with params `-1` and `"m-"` with params `1` both read `m--1`).

use crate::utils::canonical_json::to_canonical_string;
use serde_json::Value;
use thiserror::Error;

/// Separator between the method name and the rendered params.
pub const KEY_SEPARATOR: char = '-';

/// Reasons a parsed body cannot be turned into a cache key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("request body is not a JSON object")]
    NotAnObject,

    #[error("request has no method field")]
    MissingMethod,

    #[error("method field is not a string")]
    MethodNotString,
}

/// Deterministic cache key for one `(method, params)` pair.
///
/// Displays as `method-params`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    params: String,
}

impl CacheKey {
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Canonical text of `params`, empty when the request had none.
    #[must_use]
    pub fn params(&self) -> &str {
        &self.params
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{KEY_SEPARATOR}{}", self.method, self.params)
    }
}

/// Derives the cache key for a parsed JSON-RPC request.
///
/// # Errors
///
/// Returns [`KeyError`] if the request is not an object, lacks `method`, or
/// `method` is not a string.
///
/// # Example
///
/// ```
/// use relay_core::cache::derive_cache_key;
/// use serde_json::json;
///
/// let request = json!({"jsonrpc": "2.0", "id": 7, "method": "eth_getBalance",
///                      "params": ["0xabc", "latest"]});
/// let key = derive_cache_key(&request).unwrap();
/// assert_eq!(key.to_string(), r#"eth_getBalance-["0xabc","latest"]"#);
/// ```
pub fn derive_cache_key(request: &Value) -> Result<CacheKey, KeyError> {
    let object = request.as_object().ok_or(KeyError::NotAnObject)?;
    let method = match object.get("method") {
        Some(Value::String(method)) => method,
        Some(_) => return Err(KeyError::MethodNotString),
        None => return Err(KeyError::MissingMethod),
    };

    let params = object.get("params").map(to_canonical_string).unwrap_or_default();

    Ok(CacheKey { method: method.clone(), params })
}
