use crate::strategy::{
    DEFAULT_CAROUSEL_SELECTOR, DEFAULT_SLIDE_SELECTOR, ReferenceExtractor, SlideImageExtractor,
    StyleAttributeExtractor,
};
use crate::{Document, ExtractError, ImageReference, ReferenceSet};

/// Which strategies a [`ReferenceScanner`] runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Style scan always, slide scan whenever a carousel wrapper is present.
    #[default]
    Auto,
    Style,
    Slides,
}

/// Selector knobs for the scanner.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub mode: ScanMode,
    pub carousel_selector: String,
    pub slide_selector: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            mode: ScanMode::Auto,
            carousel_selector: DEFAULT_CAROUSEL_SELECTOR.into(),
            slide_selector: DEFAULT_SLIDE_SELECTOR.into(),
        }
    }
}

fn boxed<E: ReferenceExtractor + 'static>(extractor: E) -> Box<dyn ReferenceExtractor> {
    Box::new(extractor)
}

/// Runs the applicable strategies, merges their candidates in document
/// order, and normalizes them into a [`ReferenceSet`].
pub struct ReferenceScanner {
    strategies: Vec<Box<dyn ReferenceExtractor>>,
}

impl Default for ReferenceScanner {
    fn default() -> Self {
        Self::new(vec![
            boxed(StyleAttributeExtractor::default()),
            boxed(SlideImageExtractor::default()),
        ])
    }
}

impl ReferenceScanner {
    pub fn new(strategies: Vec<Box<dyn ReferenceExtractor>>) -> Self {
        Self { strategies }
    }

    pub fn from_options(options: &ScanOptions) -> Result<Self, ExtractError> {
        let slides = || {
            SlideImageExtractor::new(&options.carousel_selector, &options.slide_selector)
                .map(boxed)
        };
        let strategies = match options.mode {
            ScanMode::Auto => vec![boxed(StyleAttributeExtractor::default()), slides()?],
            ScanMode::Style => vec![boxed(StyleAttributeExtractor::default())],
            ScanMode::Slides => vec![slides()?],
        };
        Ok(Self::new(strategies))
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Scan `doc`, calling `on_tick(done, total)` once per scanned element.
    ///
    /// ```
    /// use photopack_extract::{Document, ReferenceScanner};
    ///
    /// let doc = Document::parse(
    ///     r#"<div style='background-image: url("https://cdn.example.com/a.jpg?x=1")'></div>"#,
    /// ).unwrap();
    /// let mut ticks = Vec::new();
    /// let refs = ReferenceScanner::default().scan(&doc, &mut |done, total| ticks.push((done, total)));
    ///
    /// assert_eq!(refs.listing().collect::<Vec<_>>(), vec![(1, "https://cdn.example.com/a.jpg")]);
    /// assert_eq!(ticks, vec![(1, 1)]);
    /// ```
    pub fn scan(&self, doc: &Document, on_tick: &mut dyn FnMut(usize, usize)) -> ReferenceSet {
        let mut candidates = Vec::new();
        for strategy in &self.strategies {
            if !strategy.applies_to(doc) {
                tracing::debug!(strategy = strategy.name(), "extract.strategy.skipped");
                continue;
            }
            let found = strategy.candidates(doc);
            tracing::debug!(
                strategy = strategy.name(),
                candidates = found.len(),
                "extract.strategy.scanned"
            );
            candidates.extend(found);
        }
        // Stable: an element seen by several strategies keeps strategy order.
        candidates.sort_by_key(|c| c.position);

        let total = candidates.len();
        let mut references = ReferenceSet::new();
        let mut rejected = 0usize;
        for (idx, candidate) in candidates.into_iter().enumerate() {
            if let Some(raw) = candidate.raw_url.as_deref() {
                match ImageReference::from_raw(raw) {
                    Some(reference) => {
                        references.insert(reference);
                    }
                    None => {
                        rejected += 1;
                        tracing::trace!(url = raw, "extract.reference.not_jpeg");
                    }
                }
            }
            on_tick(idx + 1, total);
        }

        tracing::info!(
            scanned = total,
            rejected,
            references = references.len(),
            "extract.references.done"
        );
        references
    }
}
