use std::sync::Arc;

use axum::Json;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::app::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Queue subsystem probe. Never an error status: a degraded queue is a
/// healthy-to-report condition.
pub async fn queue_health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.supervisor.health().await)
}

pub async fn scoring_health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let healthy = services.scoring.check_health().await;
    Json(serde_json::json!({ "healthy": healthy }))
}
