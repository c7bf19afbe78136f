//! Represents an image object stored in the bucket.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Metadata of a single object within the bucket, as returned by a HEAD.
///
/// The payload itself is not part of this struct; it lives on disk (or in
/// memory for the test backend) and is only touched by `put`/`delete`.
#[derive(Clone, FromRow, Debug, PartialEq)]
pub struct ObjectHead {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Bucket the object belongs to.
    pub bucket: String,

    /// Object key (filename + extension, or archive-relative path).
    pub key: String,

    /// Author of record. `None` only for objects written outside this service.
    pub author: Option<String>,

    /// Canned ACL the object was written with.
    pub acl: String,

    /// Content type (MIME type).
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload.
    pub etag: String,

    /// Timestamp of the last successful write.
    pub last_modified: DateTime<Utc>,
}

/// Canned ACLs understood by the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
