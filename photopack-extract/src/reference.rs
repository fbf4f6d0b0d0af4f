use serde::Serialize;
use std::collections::HashSet;

const IMAGE_SUFFIXES: [&str; 2] = [".jpg", ".jpeg"];

/// A discovered pointer to a remote JPEG.
///
/// Only constructible through [`ImageReference::from_raw`], so the canonical
/// URL always ends in `.jpg`/`.jpeg`.
///
/// ```
/// use photopack_extract::ImageReference;
///
/// let r = ImageReference::from_raw("https://cdn.example.com/a.JPG?w=800").unwrap();
/// assert_eq!(r.canonical_url(), "https://cdn.example.com/a.JPG");
/// assert!(ImageReference::from_raw("https://cdn.example.com/a.png").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageReference {
    raw_url: String,
    canonical_url: String,
}

impl ImageReference {
    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let canonical = canonicalize(raw);
        if !is_jpeg(canonical) {
            return None;
        }
        Some(Self {
            raw_url: raw.to_string(),
            canonical_url: canonical.to_string(),
        })
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }
}

/// Everything before the first `?`.
pub fn canonicalize(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

fn is_jpeg(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    IMAGE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Ordered, canonical-URL-deduplicated references. First occurrence wins.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ReferenceSet {
    items: Vec<ImageReference>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless a reference with the same canonical URL is already present.
    pub fn insert(&mut self, reference: ImageReference) -> bool {
        if !self.seen.insert(reference.canonical_url.clone()) {
            return false;
        }
        self.items.push(reference);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, canonical_url: &str) -> bool {
        self.seen.contains(canonical_url)
    }

    /// Reference at a 1-based position.
    pub fn get(&self, position: usize) -> Option<&ImageReference> {
        position.checked_sub(1).and_then(|i| self.items.get(i))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageReference> {
        self.items.iter()
    }

    /// `(position, canonical_url)` pairs with 1-based positions.
    pub fn listing(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, r)| (i + 1, r.canonical_url()))
    }
}

impl<'a> IntoIterator for &'a ReferenceSet {
    type Item = &'a ImageReference;
    type IntoIter = std::slice::Iter<'a, ImageReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<ImageReference> for ReferenceSet {
    fn from_iter<I: IntoIterator<Item = ImageReference>>(iter: I) -> Self {
        let mut set = ReferenceSet::new();
        for reference in iter {
            set.insert(reference);
        }
        set
    }
}
