//! The object store seam.
//!
//! Pipelines only talk to `dyn ObjectStore`; the concrete backend is chosen
//! once in `main` and injected through `AppState`.

use crate::models::object::{Acl, ObjectHead};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::{io, pin::Pin, time::Duration};
use thiserror::Error;
use tracing::debug;

/// Payload handed to `put`. Streams let the disk backend write without
/// buffering the whole file.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid object key `{0}`")]
    InvalidObjectKey(String),
    #[error("object `{key}` still present after {attempts} checks")]
    WaitTimeout { key: String, attempts: u32 },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Options attached to a single `put`.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub author: String,
    pub acl: Acl,
    pub content_type: Option<String>,
}

/// How long `wait_until_absent` keeps polling before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_millis(250),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch object metadata. `Ok(None)` means the key is absent.
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectHead>>;

    /// Write payload and author metadata in one call. Overwrites any
    /// existing object under `key`.
    async fn put(&self, key: &str, body: ByteStream, opts: PutOptions) -> StoreResult<ObjectHead>;

    /// Remove `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Backend readiness; `Err` carries the first failing check.
    async fn ready(&self) -> StoreResult<()>;

    fn wait_policy(&self) -> WaitPolicy;

    /// True iff metadata can be fetched. Errors count as absence.
    async fn exists(&self, key: &str) -> bool {
        matches!(self.head(key).await, Ok(Some(_)))
    }

    /// Recorded author of `key`, `None` when the key is absent or carries
    /// no author metadata.
    async fn author_of(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.head(key).await?.and_then(|head| head.author))
    }

    /// Block until `key` can no longer be fetched, polling per `wait_policy`.
    async fn wait_until_absent(&self, key: &str) -> StoreResult<()> {
        let policy = self.wait_policy();
        for attempt in 1..=policy.max_attempts {
            match self.head(key).await {
                Ok(None) => return Ok(()),
                Ok(Some(_)) => debug!(key, attempt, "object still present"),
                Err(err) => debug!(key, attempt, "head failed while waiting: {}", err),
            }
            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.delay).await;
            }
        }
        Err(StoreError::WaitTimeout {
            key: key.to_string(),
            attempts: policy.max_attempts,
        })
    }
}
