//! Background job handlers run by the queue supervisor.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use visage_core::{UpstreamError, UpstreamResult};
use visage_queue::{JobHandler, JobKind, JobPayload, QueueJob};
use visage_resilience::{RetryPolicy, execute_with_fallback};
use visage_scoring::{ScoreResult, ScoringClient};

use super::store::{
    Recommendation, RecommendationSet, RoutinePlan, RoutineWeek, ScanRecord, ScanStore,
};

/// Scores below this are considered improvement areas.
const IMPROVEMENT_THRESHOLD: f64 = 70.0;

/// Worker for `score_scan` jobs: calls the scoring service and records the
/// outcome.
pub struct ScoreScanWorker {
    scoring: ScoringClient,
    store: Arc<dyn ScanStore>,
}

impl ScoreScanWorker {
    pub fn new(scoring: ScoringClient, store: Arc<dyn ScanStore>) -> Self {
        Self { scoring, store }
    }
}

#[async_trait]
impl JobHandler for ScoreScanWorker {
    fn kind(&self) -> JobKind {
        JobKind::ScoreScan
    }

    async fn handle(&self, job: &QueueJob) -> UpstreamResult<()> {
        let JobPayload::ScoreScan {
            scan_id,
            frontal,
            side,
        } = &job.payload
        else {
            return Err(UpstreamError::malformed(
                "score_scan worker received a mismatched payload",
            ));
        };

        let (scores, used_fallback) = match side {
            Some(side) => {
                // Pair scoring rejects bad side profiles; frontal-only is the
                // fallback path. Each path carries its own retry discipline
                // inside the client, so the composition runs each path once.
                let outcome = execute_with_fallback(
                    &RetryPolicy::no_retry(),
                    || self.scoring.score_pair_data_urls(frontal, side),
                    || self.scoring.score_data_url(frontal),
                )
                .await?;
                (outcome.result, outcome.used_fallback)
            }
            None => (self.scoring.score_data_url(frontal).await?, false),
        };

        info!(
            scan_id = %scan_id,
            model_version = %scores.model_version,
            used_fallback,
            "scan scored"
        );

        self.store
            .record_scores(ScanRecord {
                scan_id: *scan_id,
                scores,
                used_fallback,
                scored_at: Utc::now(),
            })
            .await
    }
}

/// Worker for `generate_recommendations` jobs: turns recorded scores into
/// prioritized improvement advice.
pub struct RecommendationsWorker {
    store: Arc<dyn ScanStore>,
}

impl RecommendationsWorker {
    pub fn new(store: Arc<dyn ScanStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for RecommendationsWorker {
    fn kind(&self) -> JobKind {
        JobKind::GenerateRecommendations
    }

    async fn handle(&self, job: &QueueJob) -> UpstreamResult<()> {
        let JobPayload::GenerateRecommendations { scan_id } = &job.payload else {
            return Err(UpstreamError::malformed(
                "generate_recommendations worker received a mismatched payload",
            ));
        };

        let record = self.store.get_scores(*scan_id).await?.ok_or_else(|| {
            UpstreamError::Request {
                status: 404,
                message: format!("scan {scan_id} has no recorded scores"),
            }
        })?;

        let items = recommendations_for(&record.scores);
        info!(scan_id = %scan_id, count = items.len(), "recommendations generated");

        self.store
            .record_recommendations(RecommendationSet {
                scan_id: *scan_id,
                items,
                generated_at: Utc::now(),
            })
            .await
    }
}

/// Worker for `generate_routine` jobs: builds a multi-week routine.
pub struct RoutineWorker {
    store: Arc<dyn ScanStore>,
}

impl RoutineWorker {
    pub fn new(store: Arc<dyn ScanStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for RoutineWorker {
    fn kind(&self) -> JobKind {
        JobKind::GenerateRoutine
    }

    async fn handle(&self, job: &QueueJob) -> UpstreamResult<()> {
        let JobPayload::GenerateRoutine { user_id, weeks } = &job.payload else {
            return Err(UpstreamError::malformed(
                "generate_routine worker received a mismatched payload",
            ));
        };

        let plan = RoutinePlan {
            user_id: *user_id,
            weeks: build_weeks(*weeks),
            generated_at: Utc::now(),
        };

        info!(user_id = %user_id, weeks = plan.weeks.len(), "routine generated");
        self.store.record_routine(plan).await
    }
}

/// Advice per metric. Unknown metrics (a newer model may add some) get no
/// recommendation rather than a made-up one.
fn advice_for(metric: &str) -> Option<&'static str> {
    match metric {
        "jawline" => Some("chewing resistance training, tongue posture work"),
        "cheekbones" => Some("reduce sodium, facial massage to cut water retention"),
        "eyes_symmetry" => Some("sleep on your back, manage allergies to reduce puffiness"),
        "nose_harmony" => Some("contouring techniques; structural change needs a specialist"),
        "facial_symmetry" => Some("check chewing-side dominance and sleeping posture"),
        "skin_quality" => Some("AM/PM cleanse, retinoid at night, broad-spectrum SPF daily"),
        "sexual_dimorphism" => Some("strength training and body-fat reduction sharpen features"),
        _ => None,
    }
}

/// Metrics under the threshold, lowest first, become prioritized advice.
fn recommendations_for(scores: &ScoreResult) -> Vec<Recommendation> {
    let mut weakest: Vec<(&String, f64)> = scores
        .scores
        .iter()
        .filter(|(_, value)| **value < IMPROVEMENT_THRESHOLD)
        .map(|(metric, value)| (metric, *value))
        .collect();
    weakest.sort_by(|a, b| a.1.total_cmp(&b.1));

    weakest
        .into_iter()
        .filter_map(|(metric, _)| {
            advice_for(metric).map(|advice| (metric.clone(), advice.to_string()))
        })
        .enumerate()
        .map(|(rank, (metric, advice))| Recommendation {
            metric,
            advice,
            priority: (rank + 1) as u8,
        })
        .collect()
}

const WEEKLY_FOCUS: [&str; 4] = [
    "skin barrier and hydration",
    "facial posture and chewing mechanics",
    "sleep quality and recovery",
    "training and body composition",
];

fn build_weeks(weeks: u8) -> Vec<RoutineWeek> {
    (1..=weeks)
        .map(|week| RoutineWeek {
            week,
            focus: vec![
                WEEKLY_FOCUS[(week as usize - 1) % WEEKLY_FOCUS.len()].to_string(),
                WEEKLY_FOCUS[week as usize % WEEKLY_FOCUS.len()].to_string(),
            ],
        })
        .collect()
}
