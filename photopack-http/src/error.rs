use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Why an image request did not produce a body.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            HttpError::Timeout(timeout)
        } else {
            HttpError::Network(err.to_string())
        }
    }

    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        HttpError::Status {
            status,
            message: status_message(status, body),
        }
    }
}

const SNIPPET_LEN: usize = 200;

/// Reason phrase, plus a short body excerpt when the server answered in text.
fn status_message(status: StatusCode, body: &[u8]) -> String {
    let reason = status.canonical_reason().unwrap_or("unexpected status");
    let Ok(text) = std::str::from_utf8(body) else {
        return reason.to_string();
    };
    let text = text.trim();
    if text.is_empty() {
        return reason.to_string();
    }
    match text.char_indices().nth(SNIPPET_LEN) {
        Some((cut, _)) => format!("{reason} ({}...)", &text[..cut]),
        None => format!("{reason} ({text})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_bodies_are_not_quoted() {
        let err = HttpError::from_response(StatusCode::NOT_FOUND, &[0xff, 0xd8, 0xff]);
        assert_eq!(err.to_string(), "server returned 404 Not Found: Not Found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn text_bodies_are_quoted_and_truncated() {
        let msg = status_message(StatusCode::FORBIDDEN, b" hotlinking denied\n");
        assert_eq!(msg, "Forbidden (hotlinking denied)");

        let long = "x".repeat(SNIPPET_LEN + 10);
        let msg = status_message(StatusCode::BAD_GATEWAY, long.as_bytes());
        assert!(msg.ends_with("...)"));
        assert_eq!(msg.len(), "Bad Gateway (".len() + SNIPPET_LEN + "...)".len());
    }
}
