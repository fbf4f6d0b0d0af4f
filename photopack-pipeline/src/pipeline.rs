use photopack_common::{ProgressSink, Stage};
use photopack_extract::{
    ADDRESS_NOT_FOUND, AddressExtractor, DEFAULT_ADDRESS_SELECTOR, Document, ExtractError,
    InputError, ReferenceScanner, ReferenceSet, ScanOptions, validate_input,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::archive::{ArchiveError, PackagedArchive, build_archive, entry_name};
use crate::fetch::{FetchResult, FetchStatus, ImageFetcher, fetch_all};
use crate::progress::{self, ProgressTracker};
use crate::session::DownloadSession;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("run cancelled before {stage}")]
    Cancelled { stage: Stage },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub address_selector: String,
    pub scan: ScanOptions,
    /// Maximum in-flight fetches; 1 is sequential.
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            address_selector: DEFAULT_ADDRESS_SELECTOR.into(),
            scan: ScanOptions::default(),
            concurrency: 1,
        }
    }
}

/// What happened to one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Packaged { entry_name: String, size: usize },
    Failed { reason: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub position: usize,
    pub canonical_url: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemReport {
    fn from_result(result: &FetchResult) -> Self {
        let status = match &result.status {
            FetchStatus::Success(bytes) => ItemStatus::Packaged {
                entry_name: entry_name(result.position),
                size: bytes.len(),
            },
            FetchStatus::Failed(reason) => ItemStatus::Failed {
                reason: reason.clone(),
            },
            FetchStatus::Skipped => ItemStatus::Skipped,
        };
        Self {
            position: result.position,
            canonical_url: result.reference.canonical_url().to_string(),
            status,
        }
    }
}

/// Summary of a finished run. The degenerate cases are distinct so callers
/// can tell "nothing to download" from "everything failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every reference was fetched and packaged.
    Complete,
    /// Some fetches failed; the archive holds the rest.
    PartialFailure { failed: usize },
    /// The document had no image references.
    NoImagesFound,
    /// No fetch succeeded; the archive has zero entries.
    AllFetchesFailed,
    /// Every reference was already in the download session.
    NothingNew,
}

impl PipelineStatus {
    fn from_items(items: &[ItemReport]) -> Self {
        if items.is_empty() {
            return PipelineStatus::NoImagesFound;
        }
        let mut packaged = 0;
        let mut failed = 0;
        for item in items {
            match item.status {
                ItemStatus::Packaged { .. } => packaged += 1,
                ItemStatus::Failed { .. } => failed += 1,
                ItemStatus::Skipped => {}
            }
        }
        match (packaged, failed) {
            (0, 0) => PipelineStatus::NothingNew,
            (0, _) => PipelineStatus::AllFetchesFailed,
            (_, 0) => PipelineStatus::Complete,
            (_, failed) => PipelineStatus::PartialFailure { failed },
        }
    }
}

/// Everything a run produces; owned by the caller.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub address: String,
    pub references: ReferenceSet,
    pub archive: PackagedArchive,
    pub items: Vec<ItemReport>,
    pub status: PipelineStatus,
}

impl PipelineResult {
    pub fn address_found(&self) -> bool {
        self.address != ADDRESS_NOT_FOUND
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> + '_ {
        self.items
            .iter()
            .filter(|item| matches!(item.status, ItemStatus::Failed { .. }))
    }
}

/// Address and references, without fetching anything.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub address: String,
    pub references: ReferenceSet,
}

/// Sequences parsing, extraction, fetching and packaging for one fragment.
///
/// States advance `Idle → Parsing → AddressExtracted → ReferencesExtracted →
/// Fetching → Packaged → Done`, emitting one progress event per transition
/// plus per-item ticks while references are scanned and fetched.
pub struct Pipeline {
    fetcher: Arc<dyn ImageFetcher>,
    address: AddressExtractor,
    scanner: ReferenceScanner,
    concurrency: usize,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, options: PipelineOptions) -> Result<Self, ExtractError> {
        Ok(Self {
            fetcher,
            address: AddressExtractor::new(&options.address_selector)?,
            scanner: ReferenceScanner::from_options(&options.scan)?,
            concurrency: options.concurrency.max(1),
            cancel: CancellationToken::new(),
        })
    }

    /// Share an externally owned token; cancelling it aborts the run at the
    /// next stage boundary.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the whole pipeline over one HTML fragment.
    pub async fn run(
        &self,
        html: &str,
        sink: &dyn ProgressSink,
        session: &mut DownloadSession,
    ) -> Result<PipelineResult, PipelineError> {
        validate_input(html)?;
        let mut tracker = ProgressTracker::new(sink);
        tracker.emit(Stage::Idle, progress::START);

        let Extraction { address, references } = self.extract_stage(html, &mut tracker)?;

        self.checkpoint(Stage::Fetching)?;
        tracker.emit(Stage::Fetching, progress::EXTRACT_END);
        let results = fetch_all(
            self.fetcher.as_ref(),
            &references,
            session,
            self.concurrency,
            &mut |done, total| {
                tracker.tick(
                    Stage::Fetching,
                    (progress::EXTRACT_END, progress::FETCH_END),
                    done,
                    total,
                )
            },
        )
        .await;

        self.checkpoint(Stage::Packaged)?;
        let archive = build_archive(&results)?;
        let items: Vec<ItemReport> = results.iter().map(ItemReport::from_result).collect();
        let status = PipelineStatus::from_items(&items);
        tracker.emit(Stage::Packaged, progress::PACKAGED);

        session.record(&results);
        match status {
            PipelineStatus::AllFetchesFailed => tracing::warn!(
                references = references.len(),
                "pipeline.all_fetches_failed"
            ),
            PipelineStatus::NoImagesFound => tracing::info!("pipeline.no_images_found"),
            _ => {}
        }
        tracing::info!(
            address = %address,
            references = references.len(),
            entries = archive.entry_names.len(),
            archive_size = archive.bytes.len(),
            ?status,
            "pipeline.done"
        );
        tracker.emit(Stage::Done, progress::DONE);

        Ok(PipelineResult {
            address,
            references,
            archive,
            items,
            status,
        })
    }

    /// Parse and extract only; the listing-only path that fetches nothing.
    pub fn extract(&self, html: &str, sink: &dyn ProgressSink) -> Result<Extraction, PipelineError> {
        validate_input(html)?;
        let mut tracker = ProgressTracker::new(sink);
        tracker.emit(Stage::Idle, progress::START);
        let extraction = self.extract_stage(html, &mut tracker)?;
        tracker.emit(Stage::Done, progress::DONE);
        Ok(extraction)
    }

    // The parsed document never outlives this call.
    fn extract_stage(
        &self,
        html: &str,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<Extraction, PipelineError> {
        self.checkpoint(Stage::Parsing)?;
        tracker.emit(Stage::Parsing, progress::PARSING);
        let doc = Document::parse(html)?;

        self.checkpoint(Stage::AddressExtracted)?;
        let address = self.address.extract(&doc);
        if address == ADDRESS_NOT_FOUND {
            tracing::info!("pipeline.address_not_found");
        }
        tracker.emit(Stage::AddressExtracted, progress::ADDRESS_EXTRACTED);

        self.checkpoint(Stage::ReferencesExtracted)?;
        let references = self.scanner.scan(&doc, &mut |done, total| {
            tracker.tick(
                Stage::ExtractingReferences,
                (progress::EXTRACT_START, progress::EXTRACT_END),
                done,
                total,
            )
        });
        tracker.emit(Stage::ReferencesExtracted, progress::EXTRACT_END);

        Ok(Extraction {
            address,
            references,
        })
    }

    fn checkpoint(&self, stage: Stage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            tracing::info!(%stage, "pipeline.cancelled");
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }
}
