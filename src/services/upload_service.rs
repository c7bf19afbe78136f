//! Single and bulk (zip) upload pipelines.
//!
//! Both run the same per-object sequence: ownership check, open source,
//! `put` with the author as metadata and a public-read ACL.

use crate::{
    models::{
        object::{Acl, ObjectHead},
        request::{BulkUploadRequest, UploadRequest},
    },
    services::{
        archive::{self, ArchiveError, ArchiveReader, PlannedEntry},
        object_store::{ByteStream, ObjectStore, PutOptions, StoreError},
        ownership::{self, Intent},
    },
};
use std::{io, sync::Arc};
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

pub const ACCEPTED_FILE_TYPES: [&str; 3] = ["jpg", "jpeg", "png"];

/// Exact, case-sensitive match against the accepted extensions.
pub fn is_accepted_file_type(filetype: &str) -> bool {
    ACCEPTED_FILE_TYPES.contains(&filetype)
}

fn content_type_for(filetype: &str) -> Option<String> {
    match filetype {
        "jpg" | "jpeg" => Some("image/jpeg".into()),
        "png" => Some("image/png".into()),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid file type `{0}`")]
    InvalidFileType(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<ArchiveError> for PipelineError {
    fn from(err: ArchiveError) -> Self {
        PipelineError::Forbidden(err.to_string())
    }
}

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
}

impl UploadService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload one file from `req.path` under `filename.filetype`.
    pub async fn upload_single(&self, req: &UploadRequest) -> PipelineResult<ObjectHead> {
        if !is_accepted_file_type(&req.filetype) {
            return Err(PipelineError::InvalidFileType(req.filetype.clone()));
        }
        let key = req.key();
        self.check_owner(&key, &req.author).await?;

        let file = File::open(&req.path).await.map_err(|err| {
            warn!("Unable to open file {:?}: {}", req.path, err);
            PipelineError::Forbidden("Cannot open file!".into())
        })?;
        let body: ByteStream = Box::pin(ReaderStream::new(file));

        let head = self
            .store
            .put(&key, body, put_options(&req.author, &req.filetype))
            .await?;
        info!(key = %key, author = %req.author, size = head.size_bytes, "picture uploaded");
        Ok(head)
    }

    /// Upload every image entry of the zip at `req.path`.
    ///
    /// The archive is planned before anything is written. An ownership
    /// denial stops the loop; entries uploaded before it stay uploaded.
    pub async fn upload_archive(&self, req: &BulkUploadRequest) -> PipelineResult<Vec<ObjectHead>> {
        info!(archive = %req.filename, path = %req.path, "unzipping archive");
        let path = req.path.clone();
        let planned = tokio::task::spawn_blocking(move || {
            ArchiveReader::open(&path).and_then(archive::plan_upload)
        })
        .await
        .map_err(|err| PipelineError::Internal(format!("archive task failed: {err}")))?
        .inspect_err(|err| warn!("rejecting archive {:?}: {}", req.path, err))?;

        let mut uploaded = Vec::with_capacity(planned.len());
        for PlannedEntry { key, data } in planned {
            if let Err(err) = self.check_owner(&key, &req.author).await {
                warn!(
                    key = %key,
                    uploaded = uploaded.len(),
                    "aborting bulk upload on ownership denial"
                );
                return Err(err);
            }
            let filetype = key.rsplit('.').next().unwrap_or_default().to_string();
            let body: ByteStream = Box::pin(futures::stream::once(async move {
                Ok::<_, io::Error>(data)
            }));
            let head = self
                .store
                .put(&key, body, put_options(&req.author, &filetype))
                .await?;
            info!(key = %key, author = %req.author, "archive entry uploaded");
            uploaded.push(head);
        }
        Ok(uploaded)
    }

    async fn check_owner(&self, key: &str, author: &str) -> PipelineResult<()> {
        let decision = ownership::authorize(self.store.as_ref(), key, author, Intent::Write).await;
        if decision.is_allowed() {
            Ok(())
        } else {
            Err(PipelineError::Forbidden(format!("Not the author of {key}!")))
        }
    }
}

fn put_options(author: &str, filetype: &str) -> PutOptions {
    PutOptions {
        author: author.to_string(),
        acl: Acl::PublicRead,
        content_type: content_type_for(filetype),
    }
}
