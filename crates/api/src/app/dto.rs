//! Request/response DTOs and JSON mapping helpers.

use serde::Deserialize;
use serde_json::{Value, json};

use visage_core::UserId;

use super::store::{RecommendationSet, RoutinePlan, ScanRecord};

#[derive(Debug, Deserialize)]
pub struct SubmitScanRequest {
    /// Frontal image as a base64 data URL.
    pub frontal: String,
    /// Optional side-profile image as a base64 data URL.
    pub side: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRoutineRequest {
    pub user_id: UserId,
    pub weeks: u8,
}

pub fn scan_to_json(record: &ScanRecord) -> Value {
    json!({
        "scan_id": record.scan_id,
        "scores": record.scores.scores,
        "model_version": record.scores.model_version,
        "used_fallback": record.used_fallback,
        "scored_at": record.scored_at,
    })
}

pub fn recommendations_to_json(set: &RecommendationSet) -> Value {
    json!({
        "scan_id": set.scan_id,
        "items": set.items,
        "generated_at": set.generated_at,
    })
}

pub fn routine_to_json(plan: &RoutinePlan) -> Value {
    json!({
        "user_id": plan.user_id,
        "weeks": plan.weeks,
        "generated_at": plan.generated_at,
    })
}
