//! Shared helpers.

pub mod canonical_json;

pub use canonical_json::to_canonical_string;
