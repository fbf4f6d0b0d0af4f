//! Browser-like request headers for image CDNs that reject bare clients.

use reqwest::Url;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER, USER_AGENT,
};

use crate::HttpError;

/// The header set `{user_agent, referer, origin, accept, accept_language}`.
///
/// When `referer` or `origin` is `None`, the target URL's own origin is used.
///
/// ```
/// use photopack_http::BrowserHeaders;
/// use reqwest::Url;
///
/// let headers = BrowserHeaders::default();
/// let target = Url::parse("https://cdn.example.com/photos/a.jpg").unwrap();
/// let map = headers.to_header_map(&target).unwrap();
/// assert_eq!(map["origin"], "https://cdn.example.com");
/// assert_eq!(map["referer"], "https://cdn.example.com/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserHeaders {
    pub user_agent: String,
    pub referer: Option<String>,
    pub origin: Option<String>,
    pub accept: String,
    pub accept_language: String,
}

impl Default for BrowserHeaders {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".into(),
            referer: None,
            origin: None,
            accept: "image/avif,image/webp,image/apng,image/*,*/*;q=0.8".into(),
            accept_language: "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7".into(),
        }
    }
}

impl BrowserHeaders {
    /// Materialize the header map for a request to `target`.
    pub fn to_header_map(&self, target: &Url) -> Result<HeaderMap, HttpError> {
        let target_origin = target.origin().ascii_serialization();
        let origin = self.origin.clone().unwrap_or_else(|| target_origin.clone());
        let referer = self
            .referer
            .clone()
            .unwrap_or_else(|| format!("{target_origin}/"));

        let mut map = HeaderMap::new();
        insert(&mut map, USER_AGENT, &self.user_agent)?;
        insert(&mut map, ACCEPT, &self.accept)?;
        insert(&mut map, ACCEPT_LANGUAGE, &self.accept_language)?;
        insert(&mut map, REFERER, &referer)?;
        insert(&mut map, ORIGIN, &origin)?;
        Ok(map)
    }
}

fn insert(map: &mut HeaderMap, name: HeaderName, value: &str) -> Result<(), HttpError> {
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| HttpError::Build(format!("invalid {} header: {e}", name.as_str())))?;
    map.insert(name, value);
    Ok(())
}
