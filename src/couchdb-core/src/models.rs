use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::RequestError;
use crate::payload::Payload;
use crate::status::StatusTable;

/// Response headers, lower-cased names; repeated headers are joined with ", "
pub type Headers = BTreeMap<String, String>;

/// Settlement of every operation: `Ok` when `status < 400`, `Err` otherwise.
pub type DbResult = std::result::Result<DbResponse, DbResponse>;

/// DbResponse is the uniform success/failure value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbResponse {
    #[serde(default)]
    pub headers: Headers,
    /// Parsed body, or an error description for local/transport failures
    #[serde(default)]
    pub data: Value,
    pub status: u16,
    pub message: String,
    /// Milliseconds from call start to settlement
    #[serde(default)]
    pub duration: u64,
}

impl DbResponse {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Deserialize `data` into a typed value
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Route into the success or failure channel by status alone.
    pub fn settle(self) -> DbResult {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self)
        }
    }

    pub(crate) fn from_error(err: &RequestError, headers: Headers, started: Instant) -> Self {
        Self {
            headers,
            data: err.data(),
            status: err.status(),
            message: err.message(),
            duration: elapsed_ms(started),
        }
    }
}

/// Failure settled before dispatch, e.g. a document that cannot be serialized
impl From<RequestError> for DbResponse {
    fn from(err: RequestError) -> Self {
        tracing::warn!(error = %err, status = err.status(), "request rejected");
        Self::from_error(&err, Headers::new(), Instant::now())
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// One engine call: where, how, with what, and which messages to report.
#[derive(Debug)]
pub struct RequestParams {
    pub method: reqwest::Method,
    pub url: String,
    pub payload: Option<Payload>,
    pub content_type: Option<String>,
    pub statuses: StatusTable,
}

impl RequestParams {
    pub fn new(method: reqwest::Method, url: impl Into<String>, statuses: StatusTable) -> Self {
        Self {
            method,
            url: url.into(),
            payload: None,
            content_type: None,
            statuses,
        }
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
