//! Represents an object (file) stored in a bucket.

use chrono::{DateTime, Utc};

/// Content type recorded when an upload does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Represents a single object (blob) within a bucket.
///
/// The `Object` struct stores its metadata, not the actual content bytes,
/// which live in `{storage_dir}/{bucket}/{key}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
    /// Object key, unique within its bucket.
    pub key: String,

    /// Size in bytes, as counted while the body was streamed to disk.
    pub size: u64,

    /// Content type (MIME type) declared at upload time.
    pub content_type: String,

    /// Timestamp when object was last modified.
    pub last_modified: DateTime<Utc>,
}
