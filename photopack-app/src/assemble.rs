use anyhow::{Context, Result};
use photopack_common::observability::{LogConfig, LogFormat};
use photopack_common::{ProgressEvent, ProgressSink};
use photopack_config::{ExtractMode, HeaderSettings, LoggingSettings, PhotopackConfig};
use photopack_extract::{ScanMode, ScanOptions};
use photopack_http::{BrowserHeaders, HttpClient};
use photopack_pipeline::{HttpImageFetcher, Pipeline, PipelineOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub fn log_config(settings: &LoggingSettings) -> LogConfig {
    LogConfig {
        app_name: "photopack",
        log_dir: settings.dir.as_ref().map(PathBuf::from),
        emit_stderr: settings.emit_stderr,
        format: LogFormat::from_name(&settings.format),
        default_filter: settings.filter.clone(),
    }
}

fn browser_headers(settings: &HeaderSettings) -> BrowserHeaders {
    BrowserHeaders {
        user_agent: settings.user_agent.clone(),
        referer: settings.referer.clone(),
        origin: settings.origin.clone(),
        accept: settings.accept.clone(),
        accept_language: settings.accept_language.clone(),
    }
}

pub fn pipeline_options(cfg: &PhotopackConfig) -> PipelineOptions {
    let mode = match cfg.extract.mode {
        ExtractMode::Auto => ScanMode::Auto,
        ExtractMode::Style => ScanMode::Style,
        ExtractMode::Slides => ScanMode::Slides,
    };
    PipelineOptions {
        address_selector: cfg.extract.address_selector.clone(),
        scan: ScanOptions {
            mode,
            carousel_selector: cfg.extract.carousel_selector.clone(),
            slide_selector: cfg.extract.slide_selector.clone(),
        },
        concurrency: cfg.fetch.concurrency,
    }
}

/// Wire an HTTP-backed pipeline from loaded configuration.
pub fn build_pipeline(cfg: &PhotopackConfig) -> Result<Pipeline> {
    let fetch = &cfg.fetch;
    let client = HttpClient::with_connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .context("building HTTP client")?
        .with_timeout(Duration::from_secs(fetch.timeout_secs))
        .with_retries(fetch.retries);
    let fetcher = HttpImageFetcher::new(client, browser_headers(&fetch.headers));

    tracing::debug!(
        timeout_secs = fetch.timeout_secs,
        retries = fetch.retries,
        concurrency = fetch.concurrency,
        mode = ?cfg.extract.mode,
        "pipeline.configured"
    );
    Pipeline::new(Arc::new(fetcher), pipeline_options(cfg)).context("invalid extract selectors")
}

/// Writes one status line per stage to stderr.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        match event.detail {
            Some(detail) => eprintln!("[{:>3}%] {} {}", event.percent, event.stage, detail),
            None => eprintln!("[{:>3}%] {}", event.percent, event.stage),
        }
    }
}

/// Writes each progress event to stderr as one JSON line.
pub struct JsonProgress;

impl JsonProgress {
    fn line(event: &ProgressEvent) -> Option<String> {
        serde_json::to_string(event).ok()
    }
}

impl ProgressSink for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Some(line) = Self::line(&event) {
            eprintln!("{line}");
        }
    }
}

/// Turn an address into a file stem that is safe on common filesystems.
pub fn sanitize_file_stem(address: &str) -> String {
    let replaced: String = address
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "listing".to_string()
    } else {
        trimmed.to_string()
    }
}
