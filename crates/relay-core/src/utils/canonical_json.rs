//! Canonical JSON text for cache keys.
//!
//! `serde_json` only orders object keys when its `preserve_order` feature is off,
//! and any crate in the dependency graph can switch that feature on. Cache keys must
//! not depend on it, so values are sorted explicitly before rendering:
//!
//! - compact output, no insignificant whitespace
//! - object keys sorted at every depth
//! - array order preserved
//!
//! Structurally equal values therefore always render identically, and distinct
//! values never render to the same text.

use serde_json::Value;

/// Renders `value` as canonical JSON text.
///
/// # Example
///
/// ```
/// use relay_core::utils::canonical_json::to_canonical_string;
/// use serde_json::json;
///
/// let a = json!({"b": 1, "a": [true, null]});
/// assert_eq!(to_canonical_string(&a), r#"{"a":[true,null],"b":1}"#);
/// ```
#[must_use]
pub fn to_canonical_string(value: &Value) -> String {
    let mut sorted = value.clone();
    sorted.sort_all_objects();
    sorted.to_string()
}
