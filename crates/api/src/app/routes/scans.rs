use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use visage_core::ScanId;
use visage_queue::{JobPayload, QueueJob};

use crate::app::AppServices;
use crate::app::dto::{self, SubmitScanRequest};
use crate::app::errors::{json_error, upstream_error_to_response};

/// Accept a scan and enqueue scoring work. Long-running — never scored
/// inline.
pub async fn submit_scan(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<SubmitScanRequest>,
) -> axum::response::Response {
    if req.frontal.trim().is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "frontal image is required",
        );
    }

    let Some(store) = services.supervisor.store() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "queue_unavailable",
            "background processing is disabled",
        );
    };

    let scan_id = ScanId::new();
    let job = QueueJob::new(JobPayload::ScoreScan {
        scan_id,
        frontal: req.frontal,
        side: req.side,
    });

    match store.enqueue(&job).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(json!({ "scan_id": scan_id, "job_id": job_id })),
        )
            .into_response(),
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, "enqueue_failed", e.to_string()),
    }
}

pub async fn get_scan(
    Extension(services): Extension<Arc<AppServices>>,
    Path(scan_id): Path<ScanId>,
) -> axum::response::Response {
    match services.scans.get_scores(scan_id).await {
        Ok(Some(record)) => Json(dto::scan_to_json(&record)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "scan not scored yet"),
        Err(e) => upstream_error_to_response(&e),
    }
}

/// Enqueue recommendation generation for a scored scan.
pub async fn submit_recommendations(
    Extension(services): Extension<Arc<AppServices>>,
    Path(scan_id): Path<ScanId>,
) -> axum::response::Response {
    match services.scans.get_scores(scan_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return json_error(
                StatusCode::CONFLICT,
                "scan_not_scored",
                "scan has no recorded scores yet",
            );
        }
        Err(e) => return upstream_error_to_response(&e),
    }

    let Some(store) = services.supervisor.store() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "queue_unavailable",
            "background processing is disabled",
        );
    };

    let job = QueueJob::new(JobPayload::GenerateRecommendations { scan_id });
    match store.enqueue(&job).await {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))).into_response(),
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, "enqueue_failed", e.to_string()),
    }
}

pub async fn get_recommendations(
    Extension(services): Extension<Arc<AppServices>>,
    Path(scan_id): Path<ScanId>,
) -> axum::response::Response {
    match services.scans.get_recommendations(scan_id).await {
        Ok(Some(set)) => Json(dto::recommendations_to_json(&set)).into_response(),
        Ok(None) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "recommendations not generated yet",
        ),
        Err(e) => upstream_error_to_response(&e),
    }
}
