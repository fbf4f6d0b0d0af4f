//! Listing-page extraction: the address heading and the photo references.
//!
//! - [`Document`]: parsed, read-only view of a pasted HTML fragment
//! - [`AddressExtractor`]: first `h6.addr_title`, or [`ADDRESS_NOT_FOUND`]
//! - [`ReferenceExtractor`] strategies for inline `background-image` styles
//!   and carousel slide `<img>` tags, combined by [`ReferenceScanner`]
//! - [`ImageReference`] / [`ReferenceSet`]: canonical, deduplicated JPEG URLs
//!
//! Nothing here performs I/O. Absence (no address, no images) is a value,
//! never an error; the only errors are unusable input and bad selectors.

mod address;
mod document;
mod reference;
mod scanner;
pub mod strategy;

use thiserror::Error;

pub use address::{ADDRESS_NOT_FOUND, AddressExtractor, DEFAULT_ADDRESS_SELECTOR};
pub use document::{Document, InputError, validate_input};
pub use reference::{ImageReference, ReferenceSet, canonicalize};
pub use scanner::{ReferenceScanner, ScanMode, ScanOptions};
pub use strategy::{Candidate, ReferenceExtractor, SlideImageExtractor, StyleAttributeExtractor};

#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("invalid CSS selector `{selector}`: {message}")]
    Selector { selector: String, message: String },
}

pub(crate) fn parse_selector(selector: &str) -> Result<scraper::Selector, ExtractError> {
    scraper::Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
