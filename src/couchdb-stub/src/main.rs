use anyhow::Result;
use couchdb_stub::{run, telemetry, StubConfig};
use std::net::TcpListener;

#[actix_web::main]
async fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "couchdb-stub.json".to_string());
    let loaded = StubConfig::load(&path);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    let _guard = telemetry::init_telemetry(&config)?;
    if let Err(err) = &loaded {
        tracing::warn!("Failed to load {}, using defaults: {:#}", path, err);
    }

    tracing::info!("couchdb-stub starting");
    tracing::info!("  Workers: {}", config.workers);
    tracing::info!("  Max uuids per request: {}", config.max_uuids);
    tracing::info!("  Max body size: {} bytes", config.max_body_bytes);

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)?;
    tracing::info!("Starting HTTP server on {}", bind_addr);

    run(listener, config).await?;

    tracing::info!("Server stopped");
    Ok(())
}
