//! ZIP packaging of fetched images.
//!
//! Entries are named after the reference's original 1-based position, so a
//! failure at position 2 leaves a gap instead of renumbering position 3.
//! Timestamps and permissions are pinned, which makes the output a pure
//! function of the fetch results.

use bytes::Bytes;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::fetch::{FetchResult, FetchStatus};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error while writing archive: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Bytes,
}

/// Finished archive bytes plus the entry names in the order written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagedArchive {
    pub bytes: Vec<u8>,
    pub entry_names: Vec<String>,
}

impl PackagedArchive {
    pub fn is_empty(&self) -> bool {
        self.entry_names.is_empty()
    }
}

pub fn entry_name(position: usize) -> String {
    format!("image_{position}.jpg")
}

/// One entry per successful fetch, named by original position.
pub fn entries(results: &[FetchResult]) -> Vec<ArchiveEntry> {
    results
        .iter()
        .filter_map(|result| match &result.status {
            FetchStatus::Success(bytes) => Some(ArchiveEntry {
                name: entry_name(result.position),
                bytes: bytes.clone(),
            }),
            FetchStatus::Failed(_) | FetchStatus::Skipped => None,
        })
        .collect()
}

/// Deflate-compress the successful results into an in-memory ZIP.
///
/// ```
/// use photopack_pipeline::archive::build_archive;
///
/// let archive = build_archive(&[]).unwrap();
/// assert!(archive.is_empty());
/// assert!(!archive.bytes.is_empty()); // still a valid, empty ZIP
/// ```
pub fn build_archive(results: &[FetchResult]) -> Result<PackagedArchive, ArchiveError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entry_names = Vec::new();
    for entry in entries(results) {
        writer.start_file(entry.name.clone(), options)?;
        writer.write_all(&entry.bytes)?;
        entry_names.push(entry.name);
    }
    let bytes = writer.finish()?.into_inner();

    tracing::debug!(
        entries = entry_names.len(),
        size = bytes.len(),
        "archive.built"
    );
    Ok(PackagedArchive { bytes, entry_names })
}
