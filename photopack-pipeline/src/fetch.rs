//! Image fetching: one GET per reference, failures collected per item.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use photopack_extract::{ImageReference, ReferenceSet};
use photopack_http::{BrowserHeaders, HttpClient, HttpError, RequestOpts};
use thiserror::Error;
use url::Url;

use crate::DownloadSession;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid image URL `{url}`: {message}")]
    InvalidUrl { url: String, message: String },
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("{0}")]
    Other(String),
}

/// Retrieves the bytes behind one reference.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, reference: &ImageReference) -> Result<Bytes, FetchError>;
}

/// Outcome of fetching one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Success(Bytes),
    /// Human-readable cause.
    Failed(String),
    /// Already in the caller's [`DownloadSession`]; not requested.
    Skipped,
}

/// Exactly one per reference, in reference order.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// 1-based position in the reference set.
    pub position: usize,
    pub reference: ImageReference,
    pub status: FetchStatus,
}

/// Fetches canonical image URLs over HTTP with a browser-like header set.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: HttpClient,
    headers: BrowserHeaders,
}

impl HttpImageFetcher {
    pub fn new(client: HttpClient, headers: BrowserHeaders) -> Self {
        Self { client, headers }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, reference: &ImageReference) -> Result<Bytes, FetchError> {
        let url = Url::parse(reference.canonical_url()).map_err(|e| FetchError::InvalidUrl {
            url: reference.canonical_url().to_string(),
            message: e.to_string(),
        })?;
        let opts = RequestOpts {
            headers: Some(self.headers.to_header_map(&url)?),
            ..Default::default()
        };
        Ok(self.client.get_bytes(&url, opts).await?)
    }
}

/// Fetch every reference, at most `concurrency` at a time.
///
/// Results come back in reference order whatever the completion order, and
/// `on_tick(done, total)` fires once per finished item.
pub async fn fetch_all(
    fetcher: &dyn ImageFetcher,
    references: &ReferenceSet,
    session: &DownloadSession,
    concurrency: usize,
    on_tick: &mut (dyn FnMut(usize, usize) + Send),
) -> Vec<FetchResult> {
    let total = references.len();
    let mut pending = futures::stream::iter(references.iter().enumerate().map(
        |(idx, reference)| async move {
            let position = idx + 1;
            let status = if session.contains(reference.canonical_url()) {
                tracing::debug!(position, url = reference.canonical_url(), "fetch.skipped");
                FetchStatus::Skipped
            } else {
                match fetcher.fetch(reference).await {
                    Ok(bytes) => {
                        tracing::debug!(position, size = bytes.len(), "fetch.ok");
                        FetchStatus::Success(bytes)
                    }
                    Err(err) => {
                        tracing::warn!(
                            position,
                            url = reference.canonical_url(),
                            error = %err,
                            "fetch.failed"
                        );
                        FetchStatus::Failed(err.to_string())
                    }
                }
            };
            FetchResult {
                position,
                reference: reference.clone(),
                status,
            }
        },
    ))
    .buffered(concurrency.max(1));

    let mut results = Vec::with_capacity(total);
    while let Some(result) = pending.next().await {
        results.push(result);
        on_tick(results.len(), total);
    }
    results
}
