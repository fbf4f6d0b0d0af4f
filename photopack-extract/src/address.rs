use scraper::Selector;

use crate::{Document, ExtractError, parse_selector};

/// Returned when the document carries no address heading.
pub const ADDRESS_NOT_FOUND: &str = "address not found";

pub const DEFAULT_ADDRESS_SELECTOR: &str = "h6.addr_title";

/// Finds the listing address heading.
#[derive(Debug, Clone)]
pub struct AddressExtractor {
    selector: Selector,
}

impl Default for AddressExtractor {
    fn default() -> Self {
        Self {
            selector: Selector::parse(DEFAULT_ADDRESS_SELECTOR)
                .expect("default address selector is valid"),
        }
    }
}

impl AddressExtractor {
    pub fn new(selector: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            selector: parse_selector(selector)?,
        })
    }

    /// Text of the first matching element, trimmed, with each internal run
    /// of whitespace (line breaks from pretty-printed markup included)
    /// collapsed to one space. A present but blank heading yields `""`.
    pub fn find(&self, doc: &Document) -> Option<String> {
        let element = doc.html().select(&self.selector).next()?;
        let text = element.text().collect::<String>();
        Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Like [`Self::find`], falling back to [`ADDRESS_NOT_FOUND`].
    pub fn extract(&self, doc: &Document) -> String {
        self.find(doc).unwrap_or_else(|| ADDRESS_NOT_FOUND.to_string())
    }
}
