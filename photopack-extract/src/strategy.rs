//! The two encodings listing pages use for photos.
//!
//! - [`StyleAttributeExtractor`]: `style="background-image: url(&quot;https:…&quot;)"`
//! - [`SlideImageExtractor`]: `<img src>` inside the slides of a carousel wrapper

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::{Document, ExtractError, parse_selector};

/// Literal every candidate `style` attribute must contain.
pub const STYLE_NEEDLE: &str = r#"background-image: url("https:"#;
const STYLE_PATTERN: &str = r#"background-image: url\("(https:[^"]+)"\)"#;

pub const DEFAULT_CAROUSEL_SELECTOR: &str = ".swiper-wrapper";
pub const DEFAULT_SLIDE_SELECTOR: &str = ".swiper-slide";

/// One scanned element. `raw_url` is `None` when the element matched the
/// strategy's shape but carried no usable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Position of the element in document order.
    pub position: usize,
    pub raw_url: Option<String>,
}

/// A way of finding image URLs in a listing document.
pub trait ReferenceExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the document has the structure this strategy reads.
    fn applies_to(&self, _doc: &Document) -> bool {
        true
    }

    /// Scanned elements in document order.
    fn candidates(&self, doc: &Document) -> Vec<Candidate>;
}

/// Reads `background-image` URLs out of inline styles.
#[derive(Debug, Clone)]
pub struct StyleAttributeExtractor {
    pattern: Regex,
}

impl Default for StyleAttributeExtractor {
    fn default() -> Self {
        Self {
            pattern: Regex::new(STYLE_PATTERN).expect("style pattern is valid"),
        }
    }
}

impl StyleAttributeExtractor {
    fn url_in(&self, style: &str) -> Option<String> {
        self.pattern
            .captures(style)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl ReferenceExtractor for StyleAttributeExtractor {
    fn name(&self) -> &'static str {
        "style"
    }

    fn candidates(&self, doc: &Document) -> Vec<Candidate> {
        doc.elements()
            .filter_map(|(position, el)| {
                let style = el.value().attr("style")?;
                if !style.contains(STYLE_NEEDLE) {
                    return None;
                }
                let raw_url = self.url_in(style);
                if raw_url.is_none() {
                    tracing::debug!(position, style, "extract.style.no_url");
                }
                Some(Candidate { position, raw_url })
            })
            .collect()
    }
}

/// Reads `<img src>` from the direct slide children of a carousel wrapper.
#[derive(Debug, Clone)]
pub struct SlideImageExtractor {
    carousel: Selector,
    slide: Selector,
    img: Selector,
}

impl Default for SlideImageExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CAROUSEL_SELECTOR, DEFAULT_SLIDE_SELECTOR)
            .expect("default carousel selectors are valid")
    }
}

impl SlideImageExtractor {
    pub fn new(carousel: &str, slide: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            carousel: parse_selector(carousel)?,
            slide: parse_selector(slide)?,
            img: parse_selector("img[src]")?,
        })
    }

    fn is_slide(&self, el: &ElementRef<'_>) -> bool {
        self.slide.matches(el)
            && el
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|parent| self.carousel.matches(&parent))
    }
}

impl ReferenceExtractor for SlideImageExtractor {
    fn name(&self) -> &'static str {
        "slides"
    }

    fn applies_to(&self, doc: &Document) -> bool {
        doc.html().select(&self.carousel).next().is_some()
    }

    fn candidates(&self, doc: &Document) -> Vec<Candidate> {
        doc.elements()
            .filter(|(_, el)| self.is_slide(el))
            .map(|(position, slide)| Candidate {
                position,
                raw_url: slide
                    .select(&self.img)
                    .find_map(|img| img.value().attr("src"))
                    .map(str::to_string),
            })
            .collect()
    }
}
