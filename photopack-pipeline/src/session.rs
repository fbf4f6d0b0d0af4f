use std::collections::HashSet;

use crate::fetch::{FetchResult, FetchStatus};

/// Canonical URLs the caller has already downloaded during this session.
///
/// Owned by the caller and handed to each run; references found here are
/// not fetched again.
///
/// ```
/// use photopack_pipeline::DownloadSession;
///
/// let mut session = DownloadSession::default();
/// assert!(session.mark("https://cdn.example.com/a.jpg"));
/// assert!(!session.mark("https://cdn.example.com/a.jpg"));
/// assert!(session.contains("https://cdn.example.com/a.jpg"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DownloadSession {
    downloaded: HashSet<String>,
}

impl DownloadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, canonical_url: &str) -> bool {
        self.downloaded.contains(canonical_url)
    }

    /// Returns `false` if the URL was already recorded.
    pub fn mark(&mut self, canonical_url: impl Into<String>) -> bool {
        self.downloaded.insert(canonical_url.into())
    }

    /// Record every successful fetch of a run.
    pub fn record(&mut self, results: &[FetchResult]) {
        for result in results {
            if matches!(result.status, FetchStatus::Success(_)) {
                self.mark(result.reference.canonical_url());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.downloaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.downloaded.is_empty()
    }

    pub fn clear(&mut self) {
        self.downloaded.clear();
    }
}
