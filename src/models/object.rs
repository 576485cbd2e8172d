//! Represents an object (file) stored under a flat key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type reported for objects stored without one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata describing a single stored object.
///
/// The struct never holds the payload bytes; those travel separately as a
/// [`ByteStream`](crate::services::object_store::ByteStream).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Full logical path, no leading slash.
    pub key: String,

    /// Size in bytes.
    pub size: u64,

    /// MIME type supplied at upload time, if any.
    pub content_type: Option<String>,

    /// Store-assigned content fingerprint (MD5 hex).
    pub etag: String,

    /// When the object was last written.
    pub uploaded: DateTime<Utc>,
}

impl ObjectMeta {
    /// Content type to serve, falling back to `application/octet-stream`.
    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Last `/`-delimited segment of the key.
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// One row of the `GET /api/files` listing.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub uploaded: DateTime<Utc>,
    pub etag: String,
}

impl From<ObjectMeta> for FileEntry {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            name: meta.key,
            size: meta.size,
            uploaded: meta.uploaded,
            etag: meta.etag,
        }
    }
}
