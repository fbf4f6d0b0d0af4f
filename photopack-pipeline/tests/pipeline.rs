mod common;

use async_trait::async_trait;
use bytes::Bytes;
use photopack_common::{RecordingSink, Stage};
use photopack_extract::{ImageReference, InputError};
use photopack_http::{BrowserHeaders, HttpClient, HttpError};
use photopack_pipeline::{
    DownloadSession, FetchError, HttpImageFetcher, ImageFetcher, ItemStatus, Pipeline,
    PipelineError, PipelineOptions, PipelineStatus,
};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves bytes from a table; URLs not in the table fail.
#[derive(Default)]
struct TableFetcher {
    bodies: HashMap<String, Bytes>,
    calls: AtomicUsize,
}

impl TableFetcher {
    fn with(mut self, url: &str, body: &'static [u8]) -> Self {
        self.bodies.insert(url.into(), Bytes::from_static(body));
        self
    }
}

#[async_trait]
impl ImageFetcher for TableFetcher {
    async fn fetch(&self, reference: &ImageReference) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(reference.canonical_url())
            .cloned()
            .ok_or_else(|| FetchError::Other(format!("no body for {}", reference.canonical_url())))
    }
}

/// Sleeps longer for earlier positions so completion order is reversed.
struct SlowFirstFetcher;

#[async_trait]
impl ImageFetcher for SlowFirstFetcher {
    async fn fetch(&self, reference: &ImageReference) -> Result<Bytes, FetchError> {
        let delay = if reference.canonical_url().ends_with("1.jpg") { 60 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(Bytes::copy_from_slice(reference.canonical_url().as_bytes()))
    }
}

fn style_listing(urls: &[&str]) -> String {
    let slides: String = urls
        .iter()
        .map(|u| format!(r#"<div style="background-image: url(&quot;{u}&quot;)"></div>"#))
        .collect();
    format!(r#"<section><h6 class="addr_title">12 Harbour St</h6>{slides}</section>"#)
}

fn pipeline(fetcher: Arc<dyn ImageFetcher>) -> Pipeline {
    Pipeline::new(fetcher, PipelineOptions::default()).unwrap()
}

fn zip_names(bytes: &[u8]) -> Vec<String> {
    let zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    zip.file_names().map(str::to_string).collect()
}

#[tokio::test]
async fn packages_every_fetched_reference() {
    common::init_test_tracing();
    let fetcher = TableFetcher::default()
        .with("https://cdn.example.com/a.jpg", b"aaa")
        .with("https://cdn.example.com/b.jpeg", b"bbb");
    let html = style_listing(&[
        "https://cdn.example.com/a.jpg?w=800",
        "https://cdn.example.com/b.jpeg",
        "https://cdn.example.com/a.jpg?w=1600",
    ]);
    let sink = RecordingSink::default();
    let mut session = DownloadSession::new();

    let result = pipeline(Arc::new(fetcher))
        .run(&html, &sink, &mut session)
        .await
        .unwrap();

    assert_eq!(result.address, "12 Harbour St");
    assert!(result.address_found());
    assert_eq!(result.references.len(), 2);
    assert_eq!(result.status, PipelineStatus::Complete);
    assert_eq!(result.archive.entry_names, vec!["image_1.jpg", "image_2.jpg"]);
    assert_eq!(session.len(), 2);
}

#[tokio::test]
async fn missing_address_still_completes() {
    let fetcher = TableFetcher::default().with("https://cdn.example.com/a.jpg", b"aaa");
    let html = r#"<div style="background-image: url(&quot;https://cdn.example.com/a.jpg&quot;)"></div>"#;
    let sink = RecordingSink::default();

    let result = pipeline(Arc::new(fetcher))
        .run(html, &sink, &mut DownloadSession::new())
        .await
        .unwrap();

    assert_eq!(result.address, "address not found");
    assert!(!result.address_found());
    assert_eq!(sink.stages().last(), Some(&Stage::Done));
}

#[tokio::test]
async fn not_found_image_leaves_a_gap_and_run_completes() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photos/1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photos/2.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let html = format!(
        r#"<h6 class="addr_title">7 Elm Rd</h6>
        <div class="swiper-wrapper">
          <div class="swiper-slide"><img src="{0}/photos/1.jpg"></div>
          <div class="swiper-slide"><img src="{0}/photos/2.jpg?v=3"></div>
        </div>"#,
        server.uri()
    );
    let client = HttpClient::new()
        .unwrap()
        .with_timeout(Duration::from_secs(5))
        .with_retries(0);
    let fetcher = HttpImageFetcher::new(client, BrowserHeaders::default());
    let sink = RecordingSink::default();

    let result = pipeline(Arc::new(fetcher))
        .run(&html, &sink, &mut DownloadSession::new())
        .await
        .unwrap();

    assert_eq!(result.archive.entry_names, vec!["image_1.jpg"]);
    assert_eq!(zip_names(&result.archive.bytes), vec!["image_1.jpg"]);
    assert_eq!(result.status, PipelineStatus::PartialFailure { failed: 1 });

    let failures: Vec<_> = result.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].position, 2);
    assert!(failures[0].canonical_url.ends_with("/photos/2.jpg"));
    match &failures[0].status {
        ItemStatus::Failed { reason } => assert!(reason.contains("404"), "{reason}"),
        other => panic!("unexpected status {other:?}"),
    }

    let mut zip = zip::ZipArchive::new(Cursor::new(result.archive.bytes)).unwrap();
    let mut body = Vec::new();
    zip.by_name("image_1.jpg").unwrap().read_to_end(&mut body).unwrap();
    assert_eq!(body, b"first");
}

#[tokio::test]
async fn empty_input_fails_before_any_progress() {
    let sink = RecordingSink::default();
    let fetcher = Arc::new(TableFetcher::default());

    let err = pipeline(fetcher.clone())
        .run("   \n", &sink, &mut DownloadSession::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Input(InputError::Empty)));
    assert!(sink.events().is_empty());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn text_without_markup_is_an_input_error() {
    let sink = RecordingSink::default();
    let err = pipeline(Arc::new(TableFetcher::default()))
        .run("just some words", &sink, &mut DownloadSession::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Input(InputError::NoMarkup)));
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn repeated_runs_give_identical_archives() {
    let html = style_listing(&[
        "https://cdn.example.com/a.jpg",
        "https://cdn.example.com/b.jpeg",
    ]);
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(
        TableFetcher::default()
            .with("https://cdn.example.com/a.jpg", b"aaa")
            .with("https://cdn.example.com/b.jpeg", b"bbb"),
    );
    let pipeline = pipeline(fetcher);

    let first = pipeline
        .run(&html, &RecordingSink::default(), &mut DownloadSession::new())
        .await
        .unwrap();
    let second = pipeline
        .run(&html, &RecordingSink::default(), &mut DownloadSession::new())
        .await
        .unwrap();

    assert_eq!(first.archive.bytes, second.archive.bytes);
    assert_eq!(first.archive.entry_names, second.archive.entry_names);
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_at_100() {
    let html = style_listing(&[
        "https://cdn.example.com/a.jpg",
        "https://cdn.example.com/b.jpg",
        "https://cdn.example.com/c.png",
    ]);
    let fetcher = TableFetcher::default().with("https://cdn.example.com/a.jpg", b"a");
    let sink = RecordingSink::default();

    pipeline(Arc::new(fetcher))
        .run(&html, &sink, &mut DownloadSession::new())
        .await
        .unwrap();

    let percents = sink.percents();
    assert_eq!(percents.first(), Some(&0));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(percents.last(), Some(&100));
    assert_eq!(percents.iter().filter(|p| **p == 100).count(), 1);

    let stages = sink.stages();
    for stage in [
        Stage::Idle,
        Stage::Parsing,
        Stage::AddressExtracted,
        Stage::ExtractingReferences,
        Stage::ReferencesExtracted,
        Stage::Fetching,
        Stage::Packaged,
        Stage::Done,
    ] {
        assert!(stages.contains(&stage), "missing {stage:?} in {stages:?}");
    }
}

#[tokio::test]
async fn all_failures_are_distinct_from_no_images() {
    let sink = RecordingSink::default();
    let failing = style_listing(&["https://cdn.example.com/gone.jpg"]);
    let result = pipeline(Arc::new(TableFetcher::default()))
        .run(&failing, &sink, &mut DownloadSession::new())
        .await
        .unwrap();
    assert_eq!(result.status, PipelineStatus::AllFetchesFailed);
    assert!(result.archive.is_empty());

    let no_images = r#"<h6 class="addr_title">1 Quiet Ln</h6><p>no photos yet</p>"#;
    let result = pipeline(Arc::new(TableFetcher::default()))
        .run(no_images, &sink, &mut DownloadSession::new())
        .await
        .unwrap();
    assert_eq!(result.status, PipelineStatus::NoImagesFound);
    assert!(result.references.is_empty());
    assert!(result.archive.is_empty());
}

#[tokio::test]
async fn session_skips_already_downloaded_references() {
    let html = style_listing(&[
        "https://cdn.example.com/a.jpg",
        "https://cdn.example.com/b.jpg",
    ]);
    let fetcher = Arc::new(
        TableFetcher::default()
            .with("https://cdn.example.com/a.jpg", b"a")
            .with("https://cdn.example.com/b.jpg", b"b"),
    );
    let pipeline = pipeline(fetcher.clone());
    let mut session = DownloadSession::new();
    session.mark("https://cdn.example.com/a.jpg");

    let result = pipeline
        .run(&html, &RecordingSink::default(), &mut session)
        .await
        .unwrap();
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.references.len(), 2);
    assert_eq!(result.items[0].status, ItemStatus::Skipped);
    assert_eq!(result.archive.entry_names, vec!["image_2.jpg"]);
    assert_eq!(result.status, PipelineStatus::Complete);

    let again = pipeline
        .run(&html, &RecordingSink::default(), &mut session)
        .await
        .unwrap();
    assert_eq!(again.status, PipelineStatus::NothingNew);
    assert!(again.archive.is_empty());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_fetches_keep_position_names() {
    let html = style_listing(&[
        "https://cdn.example.com/1.jpg",
        "https://cdn.example.com/2.jpg",
        "https://cdn.example.com/3.jpg",
    ]);
    let options = PipelineOptions {
        concurrency: 3,
        ..Default::default()
    };
    let pipeline = Pipeline::new(Arc::new(SlowFirstFetcher), options).unwrap();

    let result = pipeline
        .run(&html, &RecordingSink::default(), &mut DownloadSession::new())
        .await
        .unwrap();

    assert_eq!(
        result.archive.entry_names,
        vec!["image_1.jpg", "image_2.jpg", "image_3.jpg"]
    );
    let mut zip = zip::ZipArchive::new(Cursor::new(result.archive.bytes)).unwrap();
    let mut body = String::new();
    zip.by_name("image_1.jpg").unwrap().read_to_string(&mut body).unwrap();
    assert_eq!(body, "https://cdn.example.com/1.jpg");
}

#[tokio::test]
async fn cancelled_token_stops_before_parsing() {
    let cancel = CancellationToken::new();
    let pipeline = pipeline(Arc::new(TableFetcher::default())).with_cancellation(cancel.clone());
    cancel.cancel();
    let sink = RecordingSink::default();

    let err = pipeline
        .run(&style_listing(&["https://cdn.example.com/a.jpg"]), &sink, &mut DownloadSession::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled { stage: Stage::Parsing }));
    assert_eq!(sink.stages(), vec![Stage::Idle]);
}

#[tokio::test]
async fn cancelling_mid_run_aborts_at_the_next_boundary() {
    struct CancelOnFetch(CancellationToken);

    #[async_trait]
    impl ImageFetcher for CancelOnFetch {
        async fn fetch(&self, _reference: &ImageReference) -> Result<Bytes, FetchError> {
            self.0.cancel();
            Err(FetchError::Http(HttpError::Timeout(Duration::from_secs(1))))
        }
    }

    let cancel = CancellationToken::new();
    let pipeline = pipeline(Arc::new(CancelOnFetch(cancel.clone()))).with_cancellation(cancel);
    let sink = RecordingSink::default();

    let err = pipeline
        .run(&style_listing(&["https://cdn.example.com/a.jpg"]), &sink, &mut DownloadSession::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled { stage: Stage::Packaged }));
    assert!(!sink.stages().contains(&Stage::Done));
}

#[test]
fn listing_only_extraction_fetches_nothing() {
    let fetcher = Arc::new(TableFetcher::default());
    let sink = RecordingSink::default();
    let html = style_listing(&[
        "https://cdn.example.com/a.jpg?x=1",
        "https://cdn.example.com/b.JPG",
    ]);

    let extraction = pipeline(fetcher.clone()).extract(&html, &sink).unwrap();

    let listing: Vec<_> = extraction.references.listing().collect();
    assert_eq!(
        listing,
        vec![
            (1, "https://cdn.example.com/a.jpg"),
            (2, "https://cdn.example.com/b.JPG"),
        ]
    );
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sink.percents().last(), Some(&100));
}

#[test]
fn invalid_selector_is_rejected_at_construction() {
    let options = PipelineOptions {
        address_selector: "h6[".into(),
        ..Default::default()
    };
    assert!(Pipeline::new(Arc::new(TableFetcher::default()), options).is_err());
}
