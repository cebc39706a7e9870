//! Request middleware.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use visage_core::CorrelationId;
use visage_resilience::with_correlation_id;

/// Trusted header carrying a caller-supplied correlation id.
pub const CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Resolve the request's correlation id (caller-supplied or fresh), run the
/// rest of the stack inside that scope, and echo the resolved id back on the
/// response so clients can log against it.
pub async fn correlation_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let id = resolve_correlation_id(req.headers());

    let mut response = with_correlation_id(id.clone(), next.run(req)).await;

    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }

    response
}

fn resolve_correlation_id(headers: &HeaderMap) -> CorrelationId {
    headers
        .get(&CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(CorrelationId::from_header)
        .unwrap_or_else(CorrelationId::generate)
}
