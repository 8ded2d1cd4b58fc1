//! Buffered request engine.
//!
//! One call is one HTTP exchange: validate, encode, send, collect, parse,
//! classify. Every outcome, including local and transport failures, settles
//! as a [`DbResponse`] on the `Ok` or `Err` side according to its status.

use futures::StreamExt;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::redirect::Policy;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWrite;
use tokio::time::{timeout, timeout_at, Instant as Deadline};

use crate::config::Config;
use crate::error::{RequestError, SetupError};
use crate::models::{elapsed_ms, DbResponse, DbResult, Headers, RequestParams};
use crate::stream::{SinkDrain, Streamed};
use crate::url::{parse_target, redact};

/// Shared HTTP client plus the request timeout.
///
/// Clones share both the connection pool and the timeout setting.
#[derive(Debug, Clone)]
pub struct Engine {
    http: reqwest::Client,
    timeout_ms: Arc<AtomicU64>,
}

impl Engine {
    pub fn new(config: &Config) -> Result<Self, SetupError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(Policy::none());

        if config.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if !config.ca_cert_path.is_empty() {
            let pem = std::fs::read(&config.ca_cert_path).map_err(|source| {
                SetupError::Certificate {
                    path: config.ca_cert_path.clone(),
                    source,
                }
            })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            http: builder.build()?,
            timeout_ms: Arc::new(AtomicU64::new(config.timeout_ms)),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Acquire))
    }

    /// Affects requests started after this call returns
    pub fn set_timeout(&self, timeout: Duration) {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.timeout_ms.store(millis, Ordering::Release);
        tracing::debug!(timeout_ms = millis, "request timeout updated");
    }

    /// Send one request and buffer the JSON response.
    #[tracing::instrument(name = "request", skip_all, fields(method = %params.method))]
    pub async fn request(&self, params: RequestParams) -> DbResult {
        let started = Instant::now();
        let limit = self.timeout();
        let deadline = deadline_after(limit);
        let statuses = params.statuses;

        let response = match self.dispatch(params, deadline, limit).await {
            Ok(response) => response,
            Err(err) => return Err(reject(err, Headers::new(), started)),
        };

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());

        let body = match collect_body(response, limit).await {
            Ok(body) => body,
            Err(err) => return Err(reject(err, headers, started)),
        };

        let data = match parse_body(&body) {
            Ok(data) => data,
            Err(err) => return Err(reject(err, headers, started)),
        };

        let settled = DbResponse {
            headers,
            data,
            status,
            message: statuses.message_for(status),
            duration: elapsed_ms(started),
        };
        tracing::debug!(status, duration_ms = settled.duration, "response received");
        settled.settle()
    }

    /// Send one request and hand the response body to `sink`.
    ///
    /// Settles as soon as the response headers are classified. On success the
    /// body has not been read yet: run [`Streamed::drain`] (or
    /// [`Streamed::finish`]) to pipe it into the sink. Failures never touch
    /// the sink.
    #[tracing::instrument(name = "request_stream", skip_all, fields(method = %params.method))]
    pub async fn request_stream<W>(
        &self,
        params: RequestParams,
        sink: W,
    ) -> Result<Streamed<W>, DbResponse>
    where
        W: AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let limit = self.timeout();
        let deadline = deadline_after(limit);
        let statuses = params.statuses;

        let response = match self.dispatch(params, deadline, limit).await {
            Ok(response) => response,
            Err(err) => return Err(reject(err, Headers::new(), started)),
        };

        let status = response.status().as_u16();
        let settled = DbResponse {
            headers: collect_headers(response.headers()),
            data: Value::Null,
            status,
            message: statuses.message_for(status),
            duration: elapsed_ms(started),
        };
        tracing::debug!(status, duration_ms = settled.duration, "response headers received");

        if !settled.is_success() {
            return Err(settled);
        }

        Ok(Streamed {
            response: settled,
            drain: SinkDrain::new(response, sink, limit, started),
        })
    }

    /// Validate, encode and send; resolves once response headers arrive.
    async fn dispatch(
        &self,
        params: RequestParams,
        deadline: Deadline,
        limit: Duration,
    ) -> Result<reqwest::Response, RequestError> {
        let RequestParams {
            method,
            url,
            payload,
            content_type,
            ..
        } = params;

        let url = match parse_target(&url) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(url = %url, "rejecting invalid url");
                return Err(err);
            }
        };
        tracing::debug!(url = %redact(&url), "dispatching request");

        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");

        if let Some(payload) = payload {
            let encoded = payload.encode(content_type.as_deref())?;
            request = request.headers(encoded.headers).body(encoded.body);
        }

        timeout_at(deadline, request.send())
            .await
            .map_err(|_| RequestError::Timeout(limit))?
            .map_err(RequestError::Transport)
    }
}

/// Fold a failure into a settled response on the error channel.
pub(crate) fn reject(err: RequestError, headers: Headers, started: Instant) -> DbResponse {
    tracing::warn!(error = %err, status = err.status(), "request failed");
    DbResponse::from_error(&err, headers, started)
}

/// Buffer the body; once headers are in, only a stall longer than `idle`
/// between chunks times out.
async fn collect_body(
    response: reqwest::Response,
    idle: Duration,
) -> Result<Vec<u8>, RequestError> {
    let mut chunks = response.bytes_stream();
    let mut body = Vec::new();
    while let Some(chunk) = timeout(idle, chunks.next())
        .await
        .map_err(|_| RequestError::Timeout(idle))?
    {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}

/// Absurdly large timeouts are capped rather than overflowing the clock
fn deadline_after(limit: Duration) -> Deadline {
    let now = Deadline::now();
    now.checked_add(limit)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

/// Empty (or whitespace-only) bodies count as `{}`
fn parse_body(body: &[u8]) -> Result<Value, RequestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(RequestError::Parse)
}

fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}
