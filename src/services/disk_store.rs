//! src/services/disk_store.rs
//!
//! DiskObjectStore — the production `ObjectStore` backend. Object metadata
//! (including the author of record) lives in SQLite; payloads live on local
//! disk sharded beneath `base_path/{bucket}/{shard}/{shard}/{key}`.
//! One instance serves exactly one bucket.

use crate::{
    models::object::ObjectHead,
    services::object_store::{
        ByteStream, ObjectStore, PutOptions, StoreError, StoreResult, WaitPolicy,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use md5::Context;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");
const MAX_OBJECT_KEY_LEN: usize = 1024;

#[derive(Clone)]
pub struct DiskObjectStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    bucket: String,
    wait: WaitPolicy,
}

impl DiskObjectStore {
    pub fn new(
        db: Arc<SqlitePool>,
        base_path: impl Into<PathBuf>,
        bucket: impl Into<String>,
        wait: WaitPolicy,
    ) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            bucket: bucket.into(),
            wait,
        }
    }

    /// Apply the embedded schema. Statements are idempotent.
    pub async fn migrate(db: &SqlitePool) -> StoreResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());

        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(db).await?;
        }
        Ok(())
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects keys that begin or end with `/`, have a `..` segment, contain
    /// backslashes or control characters, or exceed 1024 bytes.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        let invalid = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.ends_with('/')
            || key.split('/').any(|segment| segment == "..")
            || key.bytes().any(|b| b.is_ascii_control() || b == b'\\');
        if invalid {
            return Err(StoreError::InvalidObjectKey(key.to_string()));
        }
        Ok(())
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    /// Two-level shard identifiers from MD5(bucket/key), as lowercase hex.
    fn object_shards(bucket: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(&self.bucket, key);
        let mut path = self.bucket_root();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Stream `body` into a fsynced temp file next to `file_path`. Returns
    /// `(tmp_path, size, etag)`. The temp file never survives an error.
    async fn write_temp(
        &self,
        file_path: &Path,
        mut body: ByteStream,
    ) -> StoreResult<(PathBuf, i64, String)> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        let written: io::Result<()> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                size_bytes += chunk.len() as i64;
                digest.consume(&chunk);
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        Ok((tmp_path, size_bytes, format!("{:x}", digest.compute())))
    }

    async fn move_into_place(tmp_path: &Path, file_path: &Path) -> io::Result<()> {
        match fs::rename(tmp_path, file_path).await {
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                fs::remove_file(file_path).await?;
                fs::rename(tmp_path, file_path).await
            }
            other => other,
        }
    }

    /// Remove empty shard directories from `start` up to (not including) `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
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
impl ObjectStore for DiskObjectStore {
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectHead>> {
        self.ensure_key_safe(key)?;
        let head = sqlx::query_as::<_, ObjectHead>(
            "SELECT id, bucket, key, author, acl, content_type, size_bytes, etag, last_modified
             FROM objects WHERE bucket = ? AND key = ?",
        )
        .bind(&self.bucket)
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;
        Ok(head)
    }

    /// Stream-upload an object to disk and upsert its metadata row.
    ///
    /// The payload is staged in a temp file. The upsert runs in a
    /// transaction that only commits once the temp file has been renamed
    /// into place, so a failed write leaves the previous version intact.
    async fn put(&self, key: &str, body: ByteStream, opts: PutOptions) -> StoreResult<ObjectHead> {
        self.ensure_key_safe(key)?;
        let file_path = self.object_path(key);
        let (tmp_path, size_bytes, etag) = self.write_temp(&file_path, body).await?;

        let committed: StoreResult<ObjectHead> = async {
            let mut tx = self.db.begin().await?;
            let head = sqlx::query_as::<_, ObjectHead>(
                r#"
                INSERT INTO objects (
                    id, bucket, key, author, acl, content_type, size_bytes, etag, last_modified
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(bucket, key) DO UPDATE SET
                    author = excluded.author,
                    acl = excluded.acl,
                    content_type = excluded.content_type,
                    size_bytes = excluded.size_bytes,
                    etag = excluded.etag,
                    last_modified = excluded.last_modified
                RETURNING id, bucket, key, author, acl, content_type, size_bytes, etag, last_modified
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&self.bucket)
            .bind(key)
            .bind(&opts.author)
            .bind(opts.acl.as_str())
            .bind(opts.content_type.as_deref())
            .bind(size_bytes)
            .bind(&etag)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

            Self::move_into_place(&tmp_path, &file_path).await?;
            tx.commit().await?;
            Ok(head)
        }
        .await;

        if committed.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        committed
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_key_safe(key)?;
        let result = sqlx::query("DELETE FROM objects WHERE bucket = ? AND key = ?")
            .bind(&self.bucket)
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            debug!("delete of absent key {}", key);
        }

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.bucket_root()).await;
        }
        Ok(())
    }

    /// SQLite `SELECT 1` followed by a write/read/delete probe under the
    /// bucket root.
    async fn ready(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;

        let root = self.bucket_root();
        fs::create_dir_all(&root).await?;
        let probe = root.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&probe, b"readyz").await?;
        let read_back = fs::read(&probe).await;
        let _ = fs::remove_file(&probe).await;
        if read_back? != b"readyz" {
            return Err(StoreError::Io(io::Error::new(
                ErrorKind::InvalidData,
                "readiness probe content mismatch",
            )));
        }
        Ok(())
    }

    fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }
}
