//! Object store listing types and key helpers
//!
//! Defines the backend-neutral view of a listed object and the prefix/key
//! conversions shared by the remote stores.

use chrono::{DateTime, Utc};

/// Object information from a bucket listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full object key within the bucket
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modification time reported by the bucket
    pub last_modified: DateTime<Utc>,
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    /// Objects in this page
    pub objects: Vec<ObjectInfo>,
    /// Token for the next page (None if no more objects)
    pub next_continuation_token: Option<String>,
}

impl ObjectInfo {
    /// Check if this key is a folder marker
    pub fn is_directory(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// Normalize a key prefix so it ends with exactly one separator
///
/// An empty prefix stays empty and addresses the whole bucket.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Get a key relative to the prefix
///
/// Keys outside the prefix are returned unchanged.
pub fn relative_key<'a>(prefix: &str, key: &'a str) -> &'a str {
    if prefix.is_empty() {
        return key;
    }
    key.strip_prefix(prefix).unwrap_or(key)
}

/// Re-derive the full key for an identifier
pub fn full_key(prefix: &str, id: &str) -> String {
    format!("{}{}", prefix, id)
}
