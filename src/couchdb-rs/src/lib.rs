//! CouchDB Client Library
//!
//! Async client for the CouchDB HTTP API. Every call settles as a
//! [`DbResponse`]: `Ok` for statuses below 400, `Err` for everything else,
//! including invalid URLs, timeouts and unreachable servers.
//!
//! ```rust,no_run
//! use couchdb::{Client, QueryParams};
//! use serde_json::json;
//!
//! # async fn demo() -> couchdb::Result<()> {
//! let client = Client::new("http://localhost:5984")?;
//! client.create_database("testdb").await.ok();
//! let saved = client
//!     .create_document("testdb", &json!({"name": "Alice"}), Some("alice"))
//!     .await;
//! match client.get_document("testdb", "alice", &QueryParams::new()).await {
//!     Ok(doc) => println!("{} {}", doc.status, doc.data),
//!     Err(failure) => eprintln!("{} {}", failure.status, failure.message),
//! }
//! # let _ = saved;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod tables;

pub use client::Client;
pub use couchdb_core::{
    Config, DbResponse, DbResult, Delivered, Payload, QueryParams, SetupError, SinkDrain,
    Streamed,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("Configuration error: {0:#}")]
    Config(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
