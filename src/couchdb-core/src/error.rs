//! Error classification for the request engine.
//!
//! Nothing here is ever surfaced as a panic or a bare error value: every
//! [`RequestError`] is folded into a failure [`DbResponse`](crate::DbResponse)
//! with a status, a message and an error description as `data`.

use std::error::Error as StdError;
use std::time::Duration;

use serde_json::Value;

/// Failures raised while shaping, sending or reading a single request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid content type: {0:?}")]
    InvalidContentType(String),

    #[error("payload serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Parse(#[source] serde_json::Error),

    #[error("sink error: {0}")]
    Sink(#[from] std::io::Error),
}

impl RequestError {
    /// Synthetic status: 400 for local validation, 500 for everything after dispatch.
    pub fn status(&self) -> u16 {
        match self {
            RequestError::InvalidUrl(_)
            | RequestError::InvalidContentType(_)
            | RequestError::Serialize(_) => 400,
            RequestError::Timeout(_)
            | RequestError::Transport(_)
            | RequestError::Parse(_)
            | RequestError::Sink(_) => 500,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RequestError::InvalidUrl(_)
            | RequestError::InvalidContentType(_)
            | RequestError::Serialize(_) => "bad request".to_string(),
            RequestError::Timeout(_) => "request timed out".to_string(),
            RequestError::Transport(_) => "general server error".to_string(),
            RequestError::Parse(err) => err.to_string(),
            RequestError::Sink(_) => "sink error".to_string(),
        }
    }

    /// Error description carried as the failure's `data`.
    pub fn data(&self) -> Value {
        match self {
            RequestError::InvalidUrl(_) => Value::String("invalid url".to_string()),
            RequestError::Transport(err) => Value::String(describe(err)),
            RequestError::Sink(err) => Value::String(describe(err)),
            other => Value::String(other.to_string()),
        }
    }
}

/// Errors building the HTTP client itself.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read CA certificate {path}: {source}")]
    Certificate {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Render an error with its whole source chain, e.g.
/// `error sending request: client error (Connect): Connection refused`.
pub fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
