//! HTTP client for fetching listing photos.
//!
//! Only `200 OK` counts as success. Network errors, 429 and 5xx are retried
//! with exponential backoff (honouring `Retry-After`); every other status is
//! final. Each attempt is bounded by a timeout, and no retry wait is longer
//! than that timeout: a `Retry-After` beyond it ends the retries.
//!
//! ```no_run
//! # async fn demo() -> Result<(), photopack_http::HttpError> {
//! use photopack_http::{BrowserHeaders, HttpClient, RequestOpts};
//! use reqwest::Url;
//!
//! let client = HttpClient::new()?;
//! let url = Url::parse("https://cdn.example.com/a.jpg").unwrap();
//! let opts = RequestOpts {
//!     headers: Some(BrowserHeaders::default().to_header_map(&url)?),
//!     ..Default::default()
//! };
//! let bytes = client.get_bytes(&url, opts).await?;
//! # let _ = bytes;
//! # Ok(()) }
//! ```
//!
//! Events: `http.request.start`, `http.response.headers`, `http.retrying`,
//! `http.error`. Set `PHOTOPACK_HTTP_RAW=1` to also log a redacted curl line
//! and the response head under target `http.raw`.

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method, StatusCode, Url};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;

mod error;
mod headers;
mod redact;
mod retry;

pub use error::HttpError;
pub use headers::BrowserHeaders;
use retry::RetryPolicy;

const RAW_ENV: &str = "PHOTOPACK_HTTP_RAW";
const RAW_MAX_BODY: usize = 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Per-request overrides of the client defaults.
///
/// ```
/// use photopack_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(0),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub headers: Option<HeaderMap>,
}

/// One attempt's result, before the retry decision.
enum Attempt {
    Body(Bytes),
    Transport(reqwest::Error),
    Rejected {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Client with a 5 second connect timeout, 15 second request timeout and
    /// one retry.
    ///
    /// ```no_run
    /// use photopack_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 1);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(connect: Duration) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(connect)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            default_timeout: DEFAULT_TIMEOUT,
            max_retries: 1,
        })
    }

    /// ```no_run
    /// use photopack_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?.with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// GET an absolute http(s) URL and return the body of a `200 OK` response.
    pub async fn get_bytes(&self, url: &Url, opts: RequestOpts) -> Result<Bytes, HttpError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HttpError::Url(format!("unsupported scheme: {}", url.scheme())));
        }
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        // A retry wait never outlasts one request timeout.
        let policy = RetryPolicy {
            max_retries: opts.retries.unwrap_or(self.max_retries),
            max_wait: timeout,
        };
        let headers = opts.headers.unwrap_or_default();
        let req_id = format!("r{:x}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed));
        let (host_path, query) = redact::target(url);

        let mut retries = 0usize;
        loop {
            tracing::debug!(
                req_id = %req_id,
                attempt = retries + 1,
                max_retries = policy.max_retries,
                host_path = %host_path,
                query = ?query,
                timeout_ms = timeout.as_millis() as u64,
                "http.request.start"
            );
            if raw_enabled() {
                let curl = redact::curl(&Method::GET, url, &headers);
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            let (failure, delay) = match self.attempt(url, &headers, timeout, &req_id).await {
                Attempt::Body(bytes) => return Ok(bytes),
                Attempt::Transport(err) => {
                    let failure = HttpError::from_transport(err, timeout);
                    (failure, policy.backoff(retries + 1))
                }
                Attempt::Rejected {
                    status,
                    headers: resp_headers,
                    body,
                } => {
                    let failure = HttpError::from_response(status, &body);
                    match policy.delay_for_status(status, &resp_headers, retries + 1) {
                        Some(delay) => (failure, delay),
                        None => {
                            tracing::warn!(req_id = %req_id, %status, message = %failure, "http.error");
                            return Err(failure);
                        }
                    }
                }
            };

            if !policy.allows(retries) {
                tracing::warn!(
                    req_id = %req_id,
                    attempts = retries + 1,
                    message = %failure,
                    "http.error"
                );
                return Err(failure);
            }
            retries += 1;
            tracing::warn!(
                req_id = %req_id,
                retry = retries,
                max_retries = policy.max_retries,
                backoff_ms = delay.as_millis() as u64,
                message = %failure,
                "http.retrying"
            );
            sleep(delay).await;
        }
    }

    async fn attempt(
        &self,
        url: &Url,
        headers: &HeaderMap,
        timeout: Duration,
        req_id: &str,
    ) -> Attempt {
        let started = Instant::now();
        let resp = match self
            .inner
            .get(url.clone())
            .headers(headers.clone())
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => return Attempt::Transport(err),
        };
        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(err) => return Attempt::Transport(err),
        };

        let content_type = resp_headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            req_id = %req_id,
            %status,
            duration_ms,
            body_len = body.len(),
            content_type = %content_type,
            "http.response.headers"
        );
        if raw_enabled() {
            let head = String::from_utf8_lossy(&body[..body.len().min(RAW_MAX_BODY)]);
            tracing::info!(
                target: "http.raw",
                %req_id,
                %status,
                duration_ms,
                headers = ?redact::headers(&resp_headers),
                body = %head,
                truncated = body.len() > RAW_MAX_BODY
            );
        }

        if status == StatusCode::OK {
            Attempt::Body(body)
        } else {
            Attempt::Rejected {
                status,
                headers: resp_headers,
                body,
            }
        }
    }
}
