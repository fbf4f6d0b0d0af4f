use scraper::{ElementRef, Html};
use thiserror::Error;

/// Input that cannot be turned into a [`Document`]. Fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("HTML input is empty")]
    Empty,
    #[error("input does not contain any HTML markup")]
    NoMarkup,
}

/// Check that raw input looks like an HTML fragment without parsing it.
///
/// ```
/// use photopack_extract::{validate_input, InputError};
///
/// assert_eq!(validate_input("   \n"), Err(InputError::Empty));
/// assert_eq!(validate_input("just an address"), Err(InputError::NoMarkup));
/// assert!(validate_input("<div>ok</div>").is_ok());
/// ```
pub fn validate_input(raw: &str) -> Result<(), InputError> {
    if raw.trim().is_empty() {
        return Err(InputError::Empty);
    }
    let has_tag = raw
        .as_bytes()
        .windows(2)
        .any(|w| w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'!'));
    if !has_tag {
        return Err(InputError::NoMarkup);
    }
    Ok(())
}

/// Immutable parsed view of one pasted HTML fragment.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        validate_input(raw)?;
        let html = Html::parse_document(raw);
        if !html.errors.is_empty() {
            tracing::debug!(parse_errors = html.errors.len(), "html.parse.recovered");
        }
        Ok(Self { html })
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Every element in document order, paired with its position in that order.
    pub fn elements(&self) -> impl Iterator<Item = (usize, ElementRef<'_>)> + '_ {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .enumerate()
    }
}
