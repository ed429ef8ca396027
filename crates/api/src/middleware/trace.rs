//! Request spans for the trace layer.
//!
//! `DefaultMakeSpan` records the full URI, which would put a SIN from
//! `/client-applications/{sin}` into every request log line. Path segments
//! that follow a sensitive prefix are replaced before the span is built.

use axum::body::Body;
use axum::http::Request;
use tracing::Span;

const REDACTED: &str = "[redacted]";

/// Path segments whose following segment is a personal identifier.
const SENSITIVE_PREFIXES: &[&str] = &["client-applications"];

/// The request path with identifier segments replaced. The query string is dropped.
pub fn redacted_path(path: &str) -> String {
    let mut redact_next = false;
    path.split('/')
        .map(|segment| {
            let out = if redact_next && !segment.is_empty() {
                REDACTED
            } else {
                segment
            };
            redact_next = SENSITIVE_PREFIXES.contains(&segment);
            out
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `MakeSpan` for `TraceLayer::make_span_with`.
pub fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %redacted_path(request.uri().path()),
        version = ?request.version(),
    )
}
