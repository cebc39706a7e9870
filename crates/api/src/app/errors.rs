use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use visage_core::UpstreamError;

/// Map the orchestration error taxonomy to stable status codes.
pub fn upstream_error_to_response(err: &UpstreamError) -> axum::response::Response {
    match err {
        UpstreamError::Configuration(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", msg.clone())
        }
        UpstreamError::RateLimited(msg) => {
            json_error(StatusCode::TOO_MANY_REQUESTS, "upstream_rate_limited", msg.clone())
        }
        UpstreamError::Service { message, .. } => {
            json_error(StatusCode::BAD_GATEWAY, "upstream_error", message.clone())
        }
        UpstreamError::Request { message, .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "upstream_rejected", message.clone())
        }
        UpstreamError::Network(msg) => json_error(StatusCode::BAD_GATEWAY, "network_error", msg.clone()),
        UpstreamError::Timeout { .. } => {
            json_error(StatusCode::GATEWAY_TIMEOUT, "upstream_timeout", err.to_string())
        }
        UpstreamError::MalformedResponse(msg) => {
            json_error(StatusCode::BAD_GATEWAY, "malformed_upstream_response", msg.clone())
        }
        UpstreamError::QueueUnavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "queue_unavailable", msg.clone())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
