//! Job types and payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use visage_core::{CorrelationId, ScanId, UserId};
use visage_resilience::current_correlation_id;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered job types. One worker runs per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    ScoreScan,
    GenerateRecommendations,
    GenerateRoutine,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        JobKind::ScoreScan,
        JobKind::GenerateRecommendations,
        JobKind::GenerateRoutine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ScoreScan => "score_scan",
            JobKind::GenerateRecommendations => "generate_recommendations",
            JobKind::GenerateRoutine => "generate_routine",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed job payload — a tagged union keyed by job type, one variant per
/// registered worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    /// Score a submitted scan against the remote scoring service. Images ride
    /// along as base64 data URLs, opaque to this layer.
    ScoreScan {
        scan_id: ScanId,
        frontal: String,
        side: Option<String>,
    },
    /// Derive recommendations from a completed scan's scores.
    GenerateRecommendations { scan_id: ScanId },
    /// Build a multi-week routine for a user.
    GenerateRoutine { user_id: UserId, weeks: u8 },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::ScoreScan { .. } => JobKind::ScoreScan,
            JobPayload::GenerateRecommendations { .. } => JobKind::GenerateRecommendations,
            JobPayload::GenerateRoutine { .. } => JobKind::GenerateRoutine,
        }
    }
}

/// A unit of background work submitted to the durable queue.
///
/// The correlation id of the submitting call rides along so worker-side log
/// lines join the same trace. `deliveries` counts how many times the job has
/// been handed to a worker; the store bumps it on redelivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueJob {
    pub id: JobId,
    pub payload: JobPayload,
    pub enqueued_at: DateTime<Utc>,
    pub correlation_id: Option<CorrelationId>,
    pub deliveries: u32,
}

impl QueueJob {
    /// Create a job, capturing the ambient correlation id if one is in scope.
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: JobId::new(),
            payload,
            enqueued_at: Utc::now(),
            correlation_id: current_correlation_id(),
            deliveries: 0,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }

    /// Copy with the delivery counter bumped (used on redelivery).
    pub(crate) fn redelivered(&self) -> Self {
        let mut job = self.clone();
        job.deliveries += 1;
        job
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use visage_resilience::with_correlation_id;

    #[test]
    fn payload_kind_matches_variant() {
        let payload = JobPayload::ScoreScan {
            scan_id: ScanId::new(),
            frontal: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
            side: None,
        };
        assert_eq!(payload.kind(), JobKind::ScoreScan);

        let payload = JobPayload::GenerateRoutine {
            user_id: UserId::new(),
            weeks: 6,
        };
        assert_eq!(payload.kind(), JobKind::GenerateRoutine);
    }

    #[test]
    fn payload_round_trips_as_tagged_json() {
        let payload = JobPayload::GenerateRecommendations {
            scan_id: ScanId::new(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "generate_recommendations");

        let back: JobPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[tokio::test]
    async fn new_job_captures_ambient_correlation_id() {
        let id = CorrelationId::from_header("req-77").unwrap();
        let job = with_correlation_id(id.clone(), async {
            QueueJob::new(JobPayload::GenerateRecommendations {
                scan_id: ScanId::new(),
            })
        })
        .await;

        assert_eq!(job.correlation_id, Some(id));
        assert_eq!(job.deliveries, 0);
    }

    #[test]
    fn job_outside_scope_has_no_correlation_id() {
        let job = QueueJob::new(JobPayload::GenerateRoutine {
            user_id: UserId::new(),
            weeks: 4,
        });
        assert!(job.correlation_id.is_none());
    }
}
