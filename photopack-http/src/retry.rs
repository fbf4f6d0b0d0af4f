use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

const BASE_DELAY: Duration = Duration::from_millis(200);
const MIN_RATE_LIMIT_DELAY: Duration = Duration::from_millis(1100);

/// Exponential backoff over a fixed number of extra attempts.
///
/// No single wait exceeds `max_wait`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub max_retries: usize,
    pub max_wait: Duration,
}

impl RetryPolicy {
    pub fn allows(&self, retries_so_far: usize) -> bool {
        retries_so_far < self.max_retries
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: usize) -> Duration {
        let shift = retry.saturating_sub(1).min(10) as u32;
        BASE_DELAY.saturating_mul(1 << shift).min(self.max_wait)
    }

    /// Delay before retrying a response, or `None` if the status is final.
    ///
    /// `Retry-After` (in seconds) wins; a value above `max_wait` makes the
    /// status final instead of stalling the caller. 429 without it waits at
    /// least a second.
    pub fn delay_for_status(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        retry: usize,
    ) -> Option<Duration> {
        let rate_limited = status == StatusCode::TOO_MANY_REQUESTS;
        if !rate_limited && !status.is_server_error() {
            return None;
        }
        if let Some(secs) = retry_after_secs(headers) {
            let requested = Duration::from_secs(secs);
            return (requested <= self.max_wait).then_some(requested);
        }
        let delay = self.backoff(retry);
        Some(if rate_limited {
            delay.max(MIN_RATE_LIMIT_DELAY).min(self.max_wait)
        } else {
            delay
        })
    }
}

pub(crate) fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}
