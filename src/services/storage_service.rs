//! src/services/storage_service.rs
//!
//! StorageService — the default `ObjectStore`, backed by SQLite for metadata
//! and local disk for object payloads. Payloads live beneath
//! `base_path/{shard}/{shard}/{md5(key)}`, so arbitrary keys never become
//! filesystem paths.

use crate::models::object::ObjectMeta;
use crate::services::object_store::{
    ByteStream, ObjectStore, StorageError, StorageResult, StoredObject, ensure_key_valid,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use md5::Context;
use sqlx::{FromRow, SqlitePool};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

/// Row shape of the `objects` table.
#[derive(FromRow, Debug)]
struct ObjectRow {
    key: String,
    content_type: Option<String>,
    size_bytes: i64,
    etag: String,
    uploaded_at: DateTime<Utc>,
}

impl From<ObjectRow> for ObjectMeta {
    fn from(row: ObjectRow) -> Self {
        Self {
            key: row.key,
            size: row.size_bytes.max(0) as u64,
            content_type: row.content_type,
            etag: row.etag,
            uploaded: row.uploaded_at,
        }
    }
}

/// StorageService provides the object store operations:
/// - Put (streams bytes to disk, then upserts metadata into SQLite)
/// - Get / head (reads metadata from SQLite and payload from disk)
/// - List (prefix query over SQLite)
/// - Delete (removes the row, then the payload file)
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl StorageService {
    /// Create a new StorageService backed by the provided SQLite pool and
    /// using `base_path` as the root directory for object payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Construct the payload path for a key.
    ///
    /// Uses MD5(key) both as the file name and, via its first two bytes, as a
    /// two-level shard (00–ff) to bound the file count per directory.
    fn object_path(&self, key: &str) -> PathBuf {
        let digest = md5::compute(key.as_bytes());
        let mut path = self.base_path.clone();
        path.push(format!("{:02x}", digest[0]));
        path.push(format!("{:02x}", digest[1]));
        path.push(format!("{:x}", digest));
        path
    }

    async fn fetch_row(&self, key: &str) -> StorageResult<Option<ObjectRow>> {
        let row = sqlx::query_as::<_, ObjectRow>(
            "SELECT key, content_type, size_bytes, etag, uploaded_at
             FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    /// Stream `body` into a temp file next to its final location, computing
    /// size and MD5 on the way, then fsync. Returns the temp path; the caller
    /// installs it once the metadata row is written.
    async fn write_payload(
        &self,
        file_path: &Path,
        mut body: ByteStream,
    ) -> StorageResult<(PathBuf, u64, String)> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size: u64 = 0;
        let mut digest = Context::new();
        while let Some(chunk_res) = body.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StorageError::Io(err));
                }
            };
            size += chunk.len() as u64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        drop(file);

        Ok((tmp_path, size, format!("{:x}", digest.compute())))
    }

    /// Swap `tmp_path` into `file_path`, parking any previous payload at a
    /// backup path. Returns the backup path when there was one.
    async fn install_payload(
        &self,
        tmp_path: &Path,
        file_path: &Path,
    ) -> io::Result<Option<PathBuf>> {
        let backup = file_path.with_extension(format!("bak-{}", Uuid::new_v4()));
        let backup = match fs::rename(file_path, &backup).await {
            Ok(()) => Some(backup),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };

        if let Err(err) = fs::rename(tmp_path, file_path).await {
            if let Some(backup) = &backup {
                let _ = fs::rename(backup, file_path).await;
            }
            return Err(err);
        }
        Ok(backup)
    }

    /// Undo [`install_payload`](Self::install_payload): put the previous
    /// payload back, or drop the new one if there was none.
    async fn restore_payload(&self, file_path: &Path, backup: Option<PathBuf>) {
        let restored = match backup {
            Some(backup) => fs::rename(&backup, file_path).await,
            None => fs::remove_file(file_path).await,
        };
        if let Err(err) = restored {
            warn!("failed to restore payload at {}: {}", file_path.display(), err);
        }
    }

    /// Remove empty shard directories up to `base_path`.
    ///
    /// Stops at the first directory that is missing, non-empty, or fails to
    /// delete for any other reason.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<ObjectMeta>> {
        // substr() rather than LIKE: LIKE treats `%`/`_` as wildcards and
        // folds ASCII case.
        let rows = match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => {
                sqlx::query_as::<_, ObjectRow>(
                    "SELECT key, content_type, size_bytes, etag, uploaded_at
                     FROM objects WHERE substr(key, 1, ?) = ? ORDER BY key ASC",
                )
                .bind(prefix.chars().count() as i64)
                .bind(prefix)
                .fetch_all(&*self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, ObjectRow>(
                    "SELECT key, content_type, size_bytes, etag, uploaded_at
                     FROM objects ORDER BY key ASC",
                )
                .fetch_all(&*self.db)
                .await?
            }
        };
        Ok(rows.into_iter().map(ObjectMeta::from).collect())
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMeta>> {
        if key.is_empty() {
            return Ok(None);
        }
        Ok(self.fetch_row(key).await?.map(ObjectMeta::from))
    }

    /// A metadata row whose payload file has gone missing reads as absent.
    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>> {
        let Some(meta) = self.head(key).await? else {
            return Ok(None);
        };

        let file = match File::open(self.object_path(key)).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload for `{}` missing on disk", key);
                return Ok(None);
            }
            Err(err) => return Err(StorageError::Io(err)),
        };

        Ok(Some(StoredObject {
            meta,
            body: ReaderStream::new(file).boxed(),
        }))
    }

    /// Upserts the metadata row (overwrite semantics).
    ///
    /// The row is written inside a transaction and the new payload is only
    /// moved into place before the commit. Any failure leaves the previous
    /// payload and row as they were.
    async fn put(
        &self,
        key: &str,
        content_type: Option<String>,
        body: ByteStream,
    ) -> StorageResult<ObjectMeta> {
        ensure_key_valid(key)?;
        let file_path = self.object_path(key);
        let (tmp_path, size, etag) = self.write_payload(&file_path, body).await?;

        let mut tx = match self.db.begin().await {
            Ok(tx) => tx,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Sqlx(err));
            }
        };

        let upserted = sqlx::query_as::<_, ObjectRow>(
            r#"
            INSERT INTO objects (key, content_type, size_bytes, etag, uploaded_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                uploaded_at = excluded.uploaded_at
            RETURNING key, content_type, size_bytes, etag, uploaded_at
            "#,
        )
        .bind(key)
        .bind(content_type)
        .bind(size as i64)
        .bind(&etag)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        let row = match upserted {
            Ok(row) => row,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Sqlx(err));
            }
        };

        let backup = match self.install_payload(&tmp_path, &file_path).await {
            Ok(backup) => backup,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        };

        if let Err(err) = tx.commit().await {
            self.restore_payload(&file_path, backup).await;
            return Err(StorageError::Sqlx(err));
        }

        if let Some(backup) = backup {
            if let Err(err) = fs::remove_file(&backup).await {
                debug!("failed to remove old payload {}: {}", backup.display(), err);
            }
        }

        debug!("stored `{}` ({} bytes) at {}", key, size, file_path.display());
        Ok(row.into())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        ensure_key_valid(key)?;
        let result = sqlx::query("DELETE FROM objects WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }

        Ok(())
    }
}
