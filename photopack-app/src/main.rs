use anyhow::{Context, Result};
use clap::Parser;
use photopack_common::observability::init_logging;
use photopack_common::{NoopSink, ProgressSink};
use photopack_config::{PhotopackConfig, PhotopackConfigLoader};
use photopack_extract::ReferenceSet;
use photopack_pipeline::{DownloadSession, ItemReport, ItemStatus, PipelineStatus};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use assemble::{JsonProgress, StderrProgress, build_pipeline, log_config, sanitize_file_stem};
mod assemble;

const DEFAULT_CONFIG_FILE: &str = "photopack.yaml";

/// Download every listing photo referenced in a saved HTML fragment.
#[derive(Parser, Debug)]
#[command(name = "photopack", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// HTML file to read; `-` or nothing reads stdin.
    input: Option<PathBuf>,

    /// Config file (default: ./photopack.yaml when present).
    #[arg(short, long, env = "PHOTOPACK_CONFIG")]
    config: Option<PathBuf>,

    /// Archive path (default: `<address>.zip` in the current directory).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the address and image URLs without downloading anything.
    #[arg(long)]
    list_only: bool,

    /// Print a JSON summary on stdout and JSON progress lines on stderr.
    #[arg(long)]
    json: bool,

    /// Suppress progress lines on stderr.
    #[arg(short, long)]
    quiet: bool,

    /// Override `fetch.concurrency`.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Serialize)]
struct Summary<'a> {
    address: &'a str,
    references: &'a ReferenceSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<PipelineStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<&'a [ItemReport]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<&'a Path>,
}

fn load_config(cli: &Cli) -> Result<PhotopackConfig> {
    let loader = match &cli.config {
        Some(path) => PhotopackConfigLoader::new().with_file(path),
        None => PhotopackConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load().context("loading configuration")?;
    if let Some(concurrency) = cli.concurrency {
        cfg.fetch.concurrency = concurrency.max(1);
    }
    Ok(cfg)
}

async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        _ => {
            let mut html = String::new();
            tokio::io::stdin()
                .read_to_string(&mut html)
                .await
                .context("reading HTML from stdin")?;
            Ok(html)
        }
    }
}

fn print_listing(address: &str, references: &ReferenceSet) {
    println!("address: {address}");
    println!("images: {}", references.len());
    for (position, url) in references.listing() {
        println!("{position:>4}. {url}");
    }
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl_c.received");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    let log_file = init_logging(log_config(&cfg.logging))?;
    tracing::debug!(log_file = %log_file.display(), "photopack.start");

    let html = read_input(cli.input.as_deref()).await?;
    let pipeline = build_pipeline(&cfg)?;
    cancel_on_ctrl_c(pipeline.cancellation());

    let sink: Box<dyn ProgressSink> = if cli.quiet {
        Box::new(NoopSink)
    } else if cli.json {
        Box::new(JsonProgress)
    } else {
        Box::new(StderrProgress)
    };

    if cli.list_only {
        let extraction = pipeline
            .extract(&html, sink.as_ref())
            .context("extracting image references")?;
        if cli.json {
            let summary = Summary {
                address: &extraction.address,
                references: &extraction.references,
                status: None,
                items: None,
                archive: None,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_listing(&extraction.address, &extraction.references);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut session = DownloadSession::new();
    let result = pipeline
        .run(&html, sink.as_ref(), &mut session)
        .await
        .context("running photo pipeline")?;

    let archive_path = match result.status {
        PipelineStatus::Complete | PipelineStatus::PartialFailure { .. } => {
            let path = cli
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.zip", sanitize_file_stem(&result.address))));
            tokio::fs::write(&path, &result.archive.bytes)
                .await
                .with_context(|| format!("writing archive {}", path.display()))?;
            Some(path)
        }
        PipelineStatus::NoImagesFound
        | PipelineStatus::AllFetchesFailed
        | PipelineStatus::NothingNew => None,
    };

    if cli.json {
        let summary = Summary {
            address: &result.address,
            references: &result.references,
            status: Some(result.status),
            items: Some(&result.items),
            archive: archive_path.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_listing(&result.address, &result.references);
        for item in result.failures() {
            if let ItemStatus::Failed { reason } = &item.status {
                println!("failed #{} {}: {reason}", item.position, item.canonical_url);
            }
        }
        match (&result.status, &archive_path) {
            (_, Some(path)) => println!(
                "saved {} image(s) to {}",
                result.archive.entry_names.len(),
                path.display()
            ),
            (PipelineStatus::NoImagesFound, None) => println!("no images found"),
            (PipelineStatus::AllFetchesFailed, None) => {
                println!("every download failed; no archive written")
            }
            (_, None) => println!("every image was already downloaded"),
        }
    }

    Ok(match result.status {
        PipelineStatus::AllFetchesFailed => ExitCode::from(2),
        _ => ExitCode::SUCCESS,
    })
}
