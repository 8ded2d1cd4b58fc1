//! Request payloads and their wire encoding.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::RequestError;

/// Incrementally supplied request body
pub type BodyStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Request body, tagged by shape
pub enum Payload {
    /// Serialized as JSON, always sent as `application/json`
    Json(Value),
    /// Raw buffer sent as-is with the declared content type
    Bytes(Bytes),
    /// Text sent as-is with the declared content type
    Text(String),
    /// Chunked body forwarded in the order the stream yields it
    Stream(BodyStream),
}

impl Payload {
    /// JSON payload from any serializable value
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, RequestError> {
        serde_json::to_value(value)
            .map(Payload::Json)
            .map_err(RequestError::Serialize)
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Payload::Stream(stream.boxed())
    }

    /// Stream any async reader (file, child process stdout, ...)
    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Payload::stream(ReaderStream::new(reader))
    }

    pub(crate) fn encode(self, content_type: Option<&str>) -> Result<EncodedBody, RequestError> {
        let mut headers = HeaderMap::new();

        let body = match self {
            Payload::Json(value) => {
                let text = serde_json::to_vec(&value).map_err(RequestError::Serialize)?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                headers.insert(CONTENT_LENGTH, HeaderValue::from(text.len()));
                reqwest::Body::from(text)
            }
            Payload::Bytes(bytes) => {
                declare(&mut headers, content_type)?;
                headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                reqwest::Body::from(bytes)
            }
            Payload::Text(text) => {
                declare(&mut headers, content_type)?;
                headers.insert(CONTENT_LENGTH, HeaderValue::from(text.len()));
                reqwest::Body::from(text)
            }
            Payload::Stream(stream) => {
                // No length: hyper sends it chunked
                declare(&mut headers, content_type)?;
                reqwest::Body::wrap_stream(stream)
            }
        };

        Ok(EncodedBody { headers, body })
    }
}

fn declare(headers: &mut HeaderMap, content_type: Option<&str>) -> Result<(), RequestError> {
    if let Some(declared) = content_type {
        let value = HeaderValue::from_str(declared)
            .map_err(|_| RequestError::InvalidContentType(declared.to_string()))?;
        headers.insert(CONTENT_TYPE, value);
    }
    Ok(())
}

#[derive(Debug)]
pub(crate) struct EncodedBody {
    pub headers: HeaderMap,
    pub body: reqwest::Body,
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Payload::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Payload::Text(text) => write!(f, "Text({} bytes)", text.len()),
            Payload::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}
