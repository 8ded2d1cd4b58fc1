//! couchdb-core
//!
//! The request/response translation engine behind the CouchDB client:
//! - URL validation before any I/O
//! - Query string encoding with JSON-valued keys
//! - Payload encoding (JSON, bytes, text, streams)
//! - Buffered and streaming request dispatch with a shared timeout
//! - Status classification into a uniform [`DbResponse`]

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod payload;
pub mod query;
pub mod status;
pub mod stream;
pub mod url;

// Re-export commonly used types
pub use config::Config;
pub use engine::Engine;
pub use error::{RequestError, SetupError};
pub use models::{DbResponse, DbResult, Headers, RequestParams};
pub use payload::{BodyStream, Payload};
pub use query::{build_query_string, QueryParams, JSON_QUERY_KEYS};
pub use status::{status_message, StatusTable, UNKNOWN_STATUS};
pub use stream::{Delivered, SinkDrain, Streamed};
pub use url::is_valid_url;

/// Re-exported so callers can name methods without depending on reqwest.
pub use reqwest::Method;
