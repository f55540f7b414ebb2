//! HTTP cache control module
//!
//! Provides `ETag` generation and conditional request handling for assets.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Assets are immutable once published: one year, shared caches allowed
pub const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Generate a strong `ETag` from content length and hash, e.g. `"1a-9f3c..."`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Accepts a list of tags, weak tags (`W/"..."`) and the `*` wildcard.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
    })
}
