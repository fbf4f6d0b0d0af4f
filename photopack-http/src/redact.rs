//! Log-safe renderings of requests: secrets never reach a log line.

use reqwest::header::HeaderMap;
use reqwest::{Method, Url};

const REDACTED: &str = "<redacted>";
const SECRET_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];
const SECRET_PARAMS: [&str; 9] = [
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "signature",
    "sig",
];

pub(crate) fn headers(map: &HeaderMap) -> Vec<(String, String)> {
    map.iter()
        .map(|(name, value)| {
            let name = name.as_str().to_string();
            let value = if SECRET_HEADERS.contains(&name.as_str()) {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("").to_string()
            };
            (name, value)
        })
        .collect()
}

/// `host/path` and the query pairs with signed or secret values masked.
///
/// Image CDNs often sign URLs, so `sig`/`signature` values are masked too.
pub(crate) fn target(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let query = url
        .query_pairs()
        .map(|(k, v)| {
            let secret = SECRET_PARAMS.contains(&k.to_ascii_lowercase().as_str());
            let v = if secret { REDACTED.to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    (host_path, query)
}

/// A curl line that reproduces the request, for `http.raw` logging.
pub(crate) fn curl(method: &Method, url: &Url, header_map: &HeaderMap) -> String {
    let mut cmd = format!("curl -X{method}");
    for (name, value) in headers(header_map) {
        cmd.push_str(&format!(" -H '{name}: {}'", value.replace('\'', r"'\''")));
    }
    let (host_path, query) = target(url);
    let query: Vec<String> = query.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
    if query.is_empty() {
        cmd.push_str(&format!(" '{}://{host_path}'", url.scheme()));
    } else {
        cmd.push_str(&format!(" '{}://{host_path}?{}'", url.scheme(), query.join("&")));
    }
    cmd
}
