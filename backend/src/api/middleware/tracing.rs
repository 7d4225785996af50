//! Correlation IDs and per-request spans.
//!
//! Each request runs inside an `http_request` span tagged with a correlation
//! ID, which is echoed back in `X-Correlation-ID`. Service logs and SQL
//! statements emitted while handling the request nest under that span.

use std::fmt;
use std::time::Instant;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// The header name for correlation IDs.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// W3C Trace Context header.
const TRACEPARENT_HEADER: &str = "traceparent";

/// Longest caller-supplied correlation ID that is accepted.
const MAX_ID_LEN: usize = 128;

/// Correlation ID for the current request, available as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pick the ID for a request: an explicit header first, then the trace
    /// id of a well-formed `traceparent`, otherwise a fresh UUID.
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let explicit = headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| is_acceptable_id(id));

        let traced = || {
            headers
                .get(TRACEPARENT_HEADER)
                .and_then(|h| h.to_str().ok())
                .and_then(trace_id_from_traceparent)
        };

        explicit
            .map(str::to_string)
            .or_else(traced)
            .map(Self)
            .unwrap_or_else(Self::generate)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_acceptable_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// `version-traceid-parentid-flags`, trace id being 32 hex digits.
fn trace_id_from_traceparent(value: &str) -> Option<String> {
    let mut parts = value.trim().split('-');
    let _version = parts.next()?;
    let trace_id = parts.next()?;
    (trace_id.len() == 32 && trace_id.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| trace_id.to_ascii_lowercase())
}

pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::from_headers(request.headers());
    request.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let started = Instant::now();
        let mut response = next.run(request).await;

        if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }

        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
        response
    }
    .instrument(span)
    .await
}
