//! In-process `ObjectStore` used by `--memory` mode and the test suites.

use crate::models::object::ObjectMeta;
use crate::services::object_store::{
    ByteStream, ObjectStore, StorageError, StorageResult, StoredObject, bytes_stream,
    collect_bytes, ensure_key_valid,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Objects kept in a sorted map; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, (ObjectMeta, Bytes)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<ObjectMeta>> {
        let prefix = prefix.unwrap_or_default();
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, (meta, _))| meta.clone())
            .collect())
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMeta>> {
        Ok(self.objects.read().await.get(key).map(|(meta, _)| meta.clone()))
    }

    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|(meta, bytes)| StoredObject {
                meta: meta.clone(),
                body: bytes_stream(bytes.clone()),
            }))
    }

    /// The body is drained before the map is touched, so a failing stream
    /// leaves any previous object under `key` untouched.
    async fn put(
        &self,
        key: &str,
        content_type: Option<String>,
        body: ByteStream,
    ) -> StorageResult<ObjectMeta> {
        ensure_key_valid(key)?;
        let bytes = collect_bytes(body).await?;
        let meta = ObjectMeta {
            key: key.to_string(),
            size: bytes.len() as u64,
            content_type,
            etag: format!("{:x}", md5::compute(&bytes)),
            uploaded: Utc::now(),
        };
        self.objects
            .write()
            .await
            .insert(key.to_string(), (meta.clone(), bytes));
        Ok(meta)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        match self.objects.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }
}
