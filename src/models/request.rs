//! JSON request bodies accepted by the image endpoints.
//!
//! Every field defaults to its zero value so a partially decoded body still
//! flows through the pipelines (and fails their validation) instead of being
//! rejected by the extractor.

use serde::{Deserialize, Serialize};

/// Body of `POST /upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadRequest {
    pub filename: String,
    /// Bare extension, no leading dot (`jpg`, `jpeg`, `png`).
    pub filetype: String,
    /// Location of the source file on the server's filesystem.
    pub path: String,
    pub author: String,
}

impl UploadRequest {
    /// Storage key for a single upload: `filename.filetype`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.filename, self.filetype)
    }
}

/// Body of `POST /zipupload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BulkUploadRequest {
    /// Name of the archive; informational only.
    pub filename: String,
    /// Location of the zip archive on the server's filesystem.
    pub path: String,
    /// Author applied to every entry of the archive.
    pub author: String,
}

/// Body of `DELETE /delete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeleteRequest {
    /// Keys to delete, processed in order. Duplicates are processed again.
    pub filenames: Vec<String>,
    pub author: String,
}
