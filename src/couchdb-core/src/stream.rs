//! Two-phase streaming responses.
//!
//! [`Engine::request_stream`](crate::Engine::request_stream) settles on the
//! response headers. The body is piped into the sink by a separate,
//! caller-driven [`SinkDrain`]; [`Streamed::finish`] runs both phases and
//! reports the first failure.

use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::engine::reject;
use crate::error::RequestError;
use crate::models::DbResponse;

/// Header-phase result plus the pending body transfer
#[derive(Debug)]
pub struct Streamed<W> {
    pub response: DbResponse,
    pub drain: SinkDrain<W>,
}

/// Both phases completed
#[derive(Debug)]
pub struct Delivered<W> {
    pub response: DbResponse,
    pub sink: W,
    /// Bytes written to the sink
    pub bytes: u64,
}

impl<W: AsyncWrite + Unpin> Streamed<W> {
    /// Drain the body into the sink; a drain failure becomes a 500 response
    /// carrying the original headers.
    pub async fn finish(self) -> Result<Delivered<W>, DbResponse> {
        let Streamed { response, drain } = self;
        let started = drain.started;

        match drain.run().await {
            Ok((sink, bytes)) => Ok(Delivered {
                response,
                sink,
                bytes,
            }),
            Err(err) => Err(reject(err, response.headers, started)),
        }
    }
}

/// Pending transfer of a response body into a caller-owned sink
#[derive(Debug)]
pub struct SinkDrain<W> {
    body: reqwest::Response,
    sink: W,
    idle: Duration,
    started: Instant,
}

impl<W: AsyncWrite + Unpin> SinkDrain<W> {
    pub(crate) fn new(body: reqwest::Response, sink: W, idle: Duration, started: Instant) -> Self {
        Self {
            body,
            sink,
            idle,
            started,
        }
    }

    /// Pipe every chunk into the sink in order, then flush and shut it down.
    ///
    /// Each chunk must arrive within the engine timeout that was in effect
    /// when the request started. Returns the sink and the byte count.
    pub async fn run(self) -> Result<(W, u64), RequestError> {
        let SinkDrain {
            body,
            mut sink,
            idle,
            ..
        } = self;

        let mut chunks = body.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let next = tokio::time::timeout(idle, chunks.next())
                .await
                .map_err(|_| RequestError::Timeout(idle))?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        sink.flush().await?;
        sink.shutdown().await?;
        tracing::debug!(bytes = written, "response body drained into sink");

        Ok((sink, written))
    }
}
