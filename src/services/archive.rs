//! Zip archive extraction for bulk uploads.
//!
//! `ArchiveReader` walks the central directory lazily, one entry at a time.
//! `plan_upload` consumes it in a single pass and either returns every image
//! entry with its bytes, or aborts; nothing is uploaded until a plan exists.
//!
//! Sizes recorded in the archive are untrusted. Reads are bounded per entry
//! and per archive by the bytes actually decompressed.

use bytes::Bytes;
use std::{
    fs::File,
    io::{self, BufReader, Read, Seek},
    path::Path,
};
use thiserror::Error;
use tracing::debug;
use zip::{ZipArchive, result::ZipError};

use crate::services::upload_service::is_accepted_file_type;

/// Largest single image accepted from an archive.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;
/// Largest total of image bytes planned from one archive.
pub const MAX_ARCHIVE_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open archive: {0}")]
    Open(#[source] ZipError),
    #[error("archive contains directory `{0}`")]
    DirectoryEntry(String),
    #[error("archive entry `{0}` escapes the archive root")]
    UnsafePath(String),
    #[error("archive entry `{name}` exceeds the {limit} byte limit")]
    TooLarge { name: String, limit: u64 },
    #[error("cannot read archive entry `{name}`: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Metadata of one archive entry, in archive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub path: String,
    pub is_dir: bool,
}

/// An image entry selected for upload, keyed by its archive-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub key: String,
    pub data: Bytes,
}

pub struct ArchiveReader<R> {
    archive: ZipArchive<R>,
    next: usize,
    max_entry: u64,
    remaining: u64,
}

impl ArchiveReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|err| ArchiveError::Open(ZipError::Io(err)))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    pub fn new(reader: R) -> Result<Self, ArchiveError> {
        let archive = ZipArchive::new(reader).map_err(ArchiveError::Open)?;
        Ok(Self {
            archive,
            next: 0,
            max_entry: MAX_ENTRY_BYTES,
            remaining: MAX_ARCHIVE_BYTES,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_limits(mut self, max_entry: u64, max_total: u64) -> Self {
        self.max_entry = max_entry;
        self.remaining = max_total;
        self
    }

    /// Read the full contents of the entry at `index`, charging its size
    /// against the archive budget.
    pub fn read_entry(&mut self, index: usize) -> Result<Bytes, ArchiveError> {
        let limit = self.max_entry.min(self.remaining);
        let mut file = self.archive.by_index(index).map_err(|err| ArchiveError::Unreadable {
            name: format!("#{index}"),
            source: io::Error::other(err),
        })?;
        let name = file.name().to_string();
        if file.size() > limit {
            return Err(ArchiveError::TooLarge { name, limit });
        }

        let mut data = Vec::new();
        (&mut file)
            .take(limit + 1)
            .read_to_end(&mut data)
            .map_err(|source| ArchiveError::Unreadable {
                name: name.clone(),
                source,
            })?;
        let read = data.len() as u64;
        if read > limit {
            return Err(ArchiveError::TooLarge { name, limit });
        }
        self.remaining -= read;
        Ok(Bytes::from(data))
    }
}

impl<R: Read + Seek> Iterator for ArchiveReader<R> {
    type Item = Result<ArchiveEntry, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.archive.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let entry = match self.archive.by_index(index) {
            Ok(file) => {
                if file.enclosed_name().is_none() {
                    Err(ArchiveError::UnsafePath(file.name().to_string()))
                } else {
                    Ok(ArchiveEntry {
                        index,
                        path: file.name().to_string(),
                        is_dir: file.is_dir(),
                    })
                }
            }
            Err(err) => Err(ArchiveError::Unreadable {
                name: format!("#{index}"),
                source: io::Error::other(err),
            }),
        };
        Some(entry)
    }
}

/// Extension of an archive path without the dot, if any.
fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|ext| ext.to_str())
}

/// Select the image entries of an archive, reading their bytes.
///
/// Any directory entry aborts the whole plan, as does an unsafe or
/// unreadable entry. Files with other extensions are skipped.
pub fn plan_upload<R: Read + Seek>(
    mut reader: ArchiveReader<R>,
) -> Result<Vec<PlannedEntry>, ArchiveError> {
    let mut planned = Vec::new();
    while let Some(entry) = reader.next() {
        let entry = entry?;
        if entry.is_dir {
            return Err(ArchiveError::DirectoryEntry(entry.path));
        }
        if !extension(&entry.path).is_some_and(is_accepted_file_type) {
            debug!("unrecognized file {}, skipping", entry.path);
            continue;
        }
        let data = reader.read_entry(entry.index)?;
        planned.push(PlannedEntry {
            key: entry.path,
            data,
        });
    }
    Ok(planned)
}
