//! Listing photo pipeline: extract references from pasted HTML, fetch them,
//! and package the results as a ZIP.

pub mod archive;
pub mod fetch;
mod pipeline;
pub mod progress;
mod session;

pub use archive::{ArchiveError, PackagedArchive, build_archive, entry_name};
pub use fetch::{FetchError, FetchResult, FetchStatus, HttpImageFetcher, ImageFetcher, fetch_all};
pub use pipeline::{
    Extraction, ItemReport, ItemStatus, Pipeline, PipelineError, PipelineOptions, PipelineResult,
    PipelineStatus,
};
pub use session::DownloadSession;
