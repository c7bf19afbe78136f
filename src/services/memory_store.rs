//! In-memory `ObjectStore` used by the pipeline and router tests.

use crate::{
    models::object::ObjectHead,
    services::object_store::{ByteStream, ObjectStore, PutOptions, StoreResult, WaitPolicy},
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::StreamExt;
use std::{
    collections::{HashMap, HashSet},
    io,
    sync::Mutex,
    time::Duration,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (ObjectHead, Bytes)>>,
    failing_deletes: Mutex<HashSet<String>>,
    lingering: Mutex<HashSet<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing every pipeline check.
    pub fn insert(&self, key: &str, author: Option<&str>, data: &'static [u8]) {
        let head = head_for(key, author.map(str::to_string), None, "private", data);
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (head, Bytes::from_static(data)));
    }

    pub fn payload(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).map(|(_, b)| b.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Make every subsequent `delete` of `key` fail with an I/O error.
    pub fn fail_deletes_of(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    /// Make `delete` of `key` report success while the object stays
    /// visible, so absence is never observed.
    pub fn linger_after_delete(&self, key: &str) {
        self.lingering.lock().unwrap().insert(key.to_string());
    }
}

fn head_for(
    key: &str,
    author: Option<String>,
    content_type: Option<String>,
    acl: &str,
    data: &[u8],
) -> ObjectHead {
    ObjectHead {
        id: Uuid::new_v4(),
        bucket: "memory".into(),
        key: key.to_string(),
        author,
        acl: acl.to_string(),
        content_type,
        size_bytes: data.len() as i64,
        etag: format!("{:x}", md5::compute(data)),
        last_modified: Utc::now(),
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectHead>> {
        Ok(self.objects.lock().unwrap().get(key).map(|(h, _)| h.clone()))
    }

    async fn put(&self, key: &str, mut body: ByteStream, opts: PutOptions) -> StoreResult<ObjectHead> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let data = buf.freeze();
        let head = head_for(
            key,
            Some(opts.author),
            opts.content_type,
            opts.acl.as_str(),
            &data,
        );
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (head.clone(), data));
        Ok(head)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if self.failing_deletes.lock().unwrap().contains(key) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "delete refused").into());
        }
        if !self.lingering.lock().unwrap().contains(key) {
            self.objects.lock().unwrap().remove(key);
        }
        Ok(())
    }

    async fn ready(&self) -> StoreResult<()> {
        Ok(())
    }

    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}
