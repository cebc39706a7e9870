use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use visage_core::UserId;
use visage_queue::{JobPayload, QueueJob};

use crate::app::AppServices;
use crate::app::dto::{self, SubmitRoutineRequest};
use crate::app::errors::{json_error, upstream_error_to_response};

const MAX_ROUTINE_WEEKS: u8 = 12;

pub async fn submit_routine(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<SubmitRoutineRequest>,
) -> axum::response::Response {
    if req.weeks == 0 || req.weeks > MAX_ROUTINE_WEEKS {
        return json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("weeks must be between 1 and {MAX_ROUTINE_WEEKS}"),
        );
    }

    let Some(store) = services.supervisor.store() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "queue_unavailable",
            "background processing is disabled",
        );
    };

    let job = QueueJob::new(JobPayload::GenerateRoutine {
        user_id: req.user_id,
        weeks: req.weeks,
    });

    match store.enqueue(&job).await {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))).into_response(),
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, "enqueue_failed", e.to_string()),
    }
}

pub async fn get_routine(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<UserId>,
) -> axum::response::Response {
    match services.scans.get_routine(user_id).await {
        Ok(Some(plan)) => Json(dto::routine_to_json(&plan)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "routine not generated yet"),
        Err(e) => upstream_error_to_response(&e),
    }
}
