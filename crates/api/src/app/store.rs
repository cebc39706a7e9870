//! Scan result storage contract.
//!
//! The managed-storage wrapper is an external collaborator; this module only
//! fixes the request/response contract the rest of the service consumes. The
//! in-memory implementation backs tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use visage_core::{ScanId, UpstreamResult, UserId};
use visage_scoring::ScoreResult;

/// Persisted outcome of scoring one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub scan_id: ScanId,
    pub scores: ScoreResult,
    pub used_fallback: bool,
    pub scored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub metric: String,
    pub advice: String,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub scan_id: ScanId,
    pub items: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineWeek {
    pub week: u8,
    pub focus: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutinePlan {
    pub user_id: UserId,
    pub weeks: Vec<RoutineWeek>,
    pub generated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn record_scores(&self, record: ScanRecord) -> UpstreamResult<()>;
    async fn get_scores(&self, scan_id: ScanId) -> UpstreamResult<Option<ScanRecord>>;

    async fn record_recommendations(&self, set: RecommendationSet) -> UpstreamResult<()>;
    async fn get_recommendations(
        &self,
        scan_id: ScanId,
    ) -> UpstreamResult<Option<RecommendationSet>>;

    async fn record_routine(&self, plan: RoutinePlan) -> UpstreamResult<()>;
    async fn get_routine(&self, user_id: UserId) -> UpstreamResult<Option<RoutinePlan>>;
}

/// In-memory store for tests and development.
#[derive(Debug, Default)]
pub struct InMemoryScanStore {
    scores: Mutex<HashMap<ScanId, ScanRecord>>,
    recommendations: Mutex<HashMap<ScanId, RecommendationSet>>,
    routines: Mutex<HashMap<UserId, RoutinePlan>>,
}

impl InMemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanStore for InMemoryScanStore {
    async fn record_scores(&self, record: ScanRecord) -> UpstreamResult<()> {
        self.scores.lock().unwrap().insert(record.scan_id, record);
        Ok(())
    }

    async fn get_scores(&self, scan_id: ScanId) -> UpstreamResult<Option<ScanRecord>> {
        Ok(self.scores.lock().unwrap().get(&scan_id).cloned())
    }

    async fn record_recommendations(&self, set: RecommendationSet) -> UpstreamResult<()> {
        self.recommendations.lock().unwrap().insert(set.scan_id, set);
        Ok(())
    }

    async fn get_recommendations(
        &self,
        scan_id: ScanId,
    ) -> UpstreamResult<Option<RecommendationSet>> {
        Ok(self.recommendations.lock().unwrap().get(&scan_id).cloned())
    }

    async fn record_routine(&self, plan: RoutinePlan) -> UpstreamResult<()> {
        self.routines.lock().unwrap().insert(plan.user_id, plan);
        Ok(())
    }

    async fn get_routine(&self, user_id: UserId) -> UpstreamResult<Option<RoutinePlan>> {
        Ok(self.routines.lock().unwrap().get(&user_id).cloned())
    }
}
