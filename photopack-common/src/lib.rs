//! Common types and utilities shared across photopack crates.
//!
//! Holds the progress reporting contract and the logging setup used
//! throughout the workspace.
//!
//! # Overview
//!
//! - [`Stage`] and [`ProgressEvent`]: the `{stage, percent}` tuples a run emits
//! - [`ProgressSink`]: where those events go (presentation layer, tests, logs)
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! Recording the events of a run:
//!
//! ```rust
//! use photopack_common::{ProgressEvent, ProgressSink, RecordingSink, Stage};
//!
//! let sink = RecordingSink::default();
//! sink.report(ProgressEvent::new(Stage::Parsing, 10));
//! assert_eq!(sink.percents(), vec![10]);
//! ```
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

pub mod observability;

/// One phase of a pipeline run.
///
/// Most variants are states of the orchestrator; `ExtractingReferences`
/// only labels the per-element ticks emitted while references are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Parsing,
    AddressExtracted,
    ExtractingReferences,
    ReferencesExtracted,
    Fetching,
    Packaged,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Parsing => "parsing",
            Stage::AddressExtracted => "address_extracted",
            Stage::ExtractingReferences => "extracting_references",
            Stage::ReferencesExtracted => "references_extracted",
            Stage::Fetching => "fetching",
            Stage::Packaged => "packaged",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{stage, percent}` progress tuple, optionally with a `n/total` detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// Always within `0..=100`.
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProgressEvent {
    pub fn new(stage: Stage, percent: u8) -> Self {
        Self {
            stage,
            percent: percent.min(100),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Receiver of progress events. Implementations must not block for long:
/// they are called inline between units of work.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn report(&self, _event: ProgressEvent) {}
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events().into_iter().map(|e| e.percent).collect()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.events().into_iter().map(|e| e.stage).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
