//! couchdb-stub - an in-memory server speaking the CouchDB HTTP API
//!
//! Covers databases, documents, design documents and attachments, enough to
//! run the client test suites without a real CouchDB.
//!
//! # Embedded Usage
//!
//! ```rust,no_run
//! use couchdb_stub::StubConfig;
//!
//! let addr = couchdb_stub::spawn(StubConfig {
//!     port: 0,
//!     ..StubConfig::default()
//! })?;
//! println!("stub listening on http://{}", addr);
//! # Ok::<(), std::io::Error>(())
//! ```

use actix_web::{web, App, HttpServer};
use std::net::{SocketAddr, TcpListener};
use tracing_actix_web::TracingLogger;

pub mod api;
pub mod config;
pub mod store;
pub mod telemetry;

pub use config::StubConfig;

/// Serve on `listener` until the server is stopped.
pub async fn run(listener: TcpListener, config: StubConfig) -> std::io::Result<()> {
    let workers = config.workers.max(1);
    let body_limit = config.max_body_bytes;
    let state = web::Data::new(api::AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(body_limit))
            .wrap(TracingLogger::default())
            .configure(api::configure)
            .default_service(web::to(api::not_found))
    })
    .workers(workers)
    .listen(listener)?
    .run()
    .await
}

/// Bind `host:port` and serve from a dedicated thread with its own actix
/// system. Returns the bound address, so port 0 picks a free port.
pub fn spawn(config: StubConfig) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let addr = listener.local_addr()?;

    std::thread::spawn(move || {
        let system = actix_web::rt::System::new();
        if let Err(err) = system.block_on(run(listener, config)) {
            tracing::error!(error = %err, "stub server stopped");
        }
    });

    Ok(addr)
}
