//! The object store seam: a flat key space of byte payloads plus metadata.
//!
//! Handlers only ever talk to `dyn ObjectStore`; the SQLite/disk backed
//! [`StorageService`](super::storage_service::StorageService) and the
//! [`MemoryStore`](super::memory_store::MemoryStore) are the two shipped
//! implementations.

use crate::models::object::ObjectMeta;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use std::io;
use thiserror::Error;

/// Payload bytes moving in or out of the store.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

pub const MAX_OBJECT_KEY_LEN: usize = 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// An object's metadata together with its payload.
pub struct StoredObject {
    pub meta: ObjectMeta,
    pub body: ByteStream,
}

/// Key/value object storage as consumed by the HTTP layer.
///
/// Reads return `Ok(None)` for keys that are not present; callers decide how to
/// report absence. `put` overwrites any existing object under the same key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// All objects whose key starts with `prefix`, ordered by key.
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<ObjectMeta>>;

    /// Metadata only.
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMeta>>;

    /// Metadata and body.
    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>>;

    /// Write `body` under `key`, returning the new object's metadata.
    async fn put(
        &self,
        key: &str,
        content_type: Option<String>,
        body: ByteStream,
    ) -> StorageResult<ObjectMeta>;

    /// Remove `key`. Returns `NotFound` if nothing was stored under it.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Reject keys the stores cannot address.
///
/// Keys are opaque, so only emptiness, length and control bytes are checked.
pub fn ensure_key_valid(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    if key.bytes().any(|b| b.is_ascii_control()) {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Wrap an in-memory buffer as a single-chunk stream.
pub fn bytes_stream(bytes: impl Into<Bytes>) -> ByteStream {
    futures::stream::once(futures::future::ready(Ok(bytes.into()))).boxed()
}

/// Drain a stream into one contiguous buffer.
pub async fn collect_bytes(mut stream: ByteStream) -> io::Result<Bytes> {
    let mut buf = bytes::BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
