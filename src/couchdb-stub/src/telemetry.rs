//! Tracing setup for the stub binary
//!
//! Console output always; JSON lines to a daily rotated file when
//! `log_dir` is set.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::StubConfig;

/// Install the global subscriber.
///
/// Returns the file writer guard, which must be kept alive to flush logs.
pub fn init_telemetry(config: &StubConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("couchdb_stub=debug,couchdb_core=debug,actix_web=info")
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    let (file_layer, guard) = if config.log_dir.is_empty() {
        (None, None)
    } else {
        let log_dir = Path::new(&config.log_dir);
        std::fs::create_dir_all(log_dir)?;

        // couchdb-stub.log.YYYY-MM-DD
        let appender = tracing_appender::rolling::daily(log_dir, "couchdb-stub.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    if !config.log_dir.is_empty() {
        tracing::info!("Telemetry initialized with file logging to {}", config.log_dir);
    }

    Ok(guard)
}
