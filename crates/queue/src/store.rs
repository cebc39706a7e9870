//! Queue backing-store implementations.
//!
//! The Redis store uses the reliable-list pattern: a claim moves the job from
//! its pending list into a per-kind processing list, an ack removes it there,
//! and a failed job is either pushed back to pending with its delivery
//! counter bumped or, past the delivery cap, appended to the dead-letter
//! list.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::job::{JobId, JobKind, QueueJob};

const KEY_PREFIX: &str = "visage:jobs";
const DLQ_KEY: &str = "visage:jobs:dlq";

/// Queue backing-store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("queue connection error: {0}")]
    Connection(String),

    #[error("queue command error: {0}")]
    Command(String),

    #[error("job serialization error: {0}")]
    Serialization(String),
}

/// A job handed to a worker, still owned by the processing list.
///
/// The raw wire form is kept so ack/requeue remove exactly the entry that was
/// claimed, independent of any re-serialization drift.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job: QueueJob,
    raw: String,
}

/// Entry in the dead-letter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub job: QueueJob,
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Durable queue abstraction consumed by the supervisor's workers.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append a job to its kind's pending list.
    async fn enqueue(&self, job: &QueueJob) -> Result<JobId, QueueError>;

    /// Claim the next job of `kind`, waiting up to `wait` for one to appear.
    /// The claimed job sits in the processing list until acked, requeued, or
    /// dead-lettered.
    async fn claim(&self, kind: JobKind, wait: Duration) -> Result<Option<ClaimedJob>, QueueError>;

    /// Acknowledge successful completion: the job is removed for good.
    async fn ack(&self, claimed: &ClaimedJob) -> Result<(), QueueError>;

    /// Return a failed job to its pending list with the delivery counter
    /// bumped.
    async fn requeue(&self, claimed: &ClaimedJob) -> Result<(), QueueError>;

    /// Move a job past its delivery cap to the dead-letter list.
    async fn dead_letter(&self, claimed: &ClaimedJob, reason: &str) -> Result<(), QueueError>;

    /// Lightweight connectivity check used by the health probe.
    async fn ping(&self) -> Result<(), QueueError>;
}

fn pending_key(kind: JobKind) -> String {
    format!("{KEY_PREFIX}:{kind}")
}

fn processing_key(kind: JobKind) -> String {
    format!("{KEY_PREFIX}:{kind}:processing")
}

fn encode(job: &QueueJob) -> Result<String, QueueError> {
    serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))
}

/// Redis-backed store.
#[derive(Clone)]
pub struct RedisQueueStore {
    client: redis::Client,
}

impl RedisQueueStore {
    /// Parse the connection URL. The address is not contacted until the first
    /// command; use [`QueueStore::ping`] to verify reachability.
    pub fn open(redis_url: &str) -> Result<Self, QueueError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| QueueError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn enqueue(&self, job: &QueueJob) -> Result<JobId, QueueError> {
        let payload = encode(job)?;
        let mut conn = self.connection().await?;

        let _: i64 = redis::cmd("LPUSH")
            .arg(pending_key(job.kind()))
            .arg(&payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(format!("LPUSH failed: {e}")))?;

        Ok(job.id)
    }

    async fn claim(&self, kind: JobKind, wait: Duration) -> Result<Option<ClaimedJob>, QueueError> {
        let mut conn = self.connection().await?;

        // BLMOVE pending -> processing, blocking up to `wait` seconds.
        let raw: Option<String> = redis::cmd("BLMOVE")
            .arg(pending_key(kind))
            .arg(processing_key(kind))
            .arg("RIGHT")
            .arg("LEFT")
            .arg(wait.as_secs_f64())
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(format!("BLMOVE failed: {e}")))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<QueueJob>(&raw) {
            Ok(job) => Ok(Some(ClaimedJob { job, raw })),
            Err(e) => {
                // An undecodable entry would poison the worker loop forever;
                // drop it from processing and surface the failure.
                let _: Result<i64, _> = redis::cmd("LREM")
                    .arg(processing_key(kind))
                    .arg(1)
                    .arg(&raw)
                    .query_async(&mut conn)
                    .await;
                Err(QueueError::Serialization(e.to_string()))
            }
        }
    }

    async fn ack(&self, claimed: &ClaimedJob) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;

        let _: i64 = redis::cmd("LREM")
            .arg(processing_key(claimed.job.kind()))
            .arg(1)
            .arg(&claimed.raw)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(format!("LREM failed: {e}")))?;

        Ok(())
    }

    async fn requeue(&self, claimed: &ClaimedJob) -> Result<(), QueueError> {
        let bumped = encode(&claimed.job.redelivered())?;
        let mut conn = self.connection().await?;

        let mut pipe = redis::pipe();
        pipe.cmd("LREM")
            .arg(processing_key(claimed.job.kind()))
            .arg(1)
            .arg(&claimed.raw)
            .ignore()
            .cmd("LPUSH")
            .arg(pending_key(claimed.job.kind()))
            .arg(&bumped)
            .ignore();

        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| QueueError::Command(format!("requeue pipeline failed: {e}")))
    }

    async fn dead_letter(&self, claimed: &ClaimedJob, reason: &str) -> Result<(), QueueError> {
        let entry = DeadLetterEntry {
            job: claimed.job.clone(),
            reason: reason.to_string(),
            dead_lettered_at: Utc::now(),
        };
        let payload =
            serde_json::to_string(&entry).map_err(|e| QueueError::Serialization(e.to_string()))?;
        let mut conn = self.connection().await?;

        let mut pipe = redis::pipe();
        pipe.cmd("LREM")
            .arg(processing_key(claimed.job.kind()))
            .arg(1)
            .arg(&claimed.raw)
            .ignore()
            .cmd("LPUSH")
            .arg(DLQ_KEY)
            .arg(&payload)
            .ignore();

        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| QueueError::Command(format!("dead-letter pipeline failed: {e}")))?;

        warn!(job_id = %claimed.job.id, kind = %claimed.job.kind(), reason, "job dead-lettered");
        Ok(())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(format!("PING failed: {e}")))?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(QueueError::Command(format!("unexpected PING reply: {pong}")))
        }
    }
}

/// In-memory store for tests and development.
#[derive(Default)]
pub struct InMemoryQueueStore {
    inner: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    pending: HashMap<JobKind, VecDeque<String>>,
    processing: HashMap<JobKind, Vec<String>>,
    dead_letters: Vec<DeadLetterEntry>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.inner.lock().unwrap().dead_letters.clone()
    }

    pub fn pending_len(&self, kind: JobKind) -> usize {
        self.inner
            .lock()
            .unwrap()
            .pending
            .get(&kind)
            .map_or(0, VecDeque::len)
    }

    pub fn processing_len(&self, kind: JobKind) -> usize {
        self.inner
            .lock()
            .unwrap()
            .processing
            .get(&kind)
            .map_or(0, Vec::len)
    }

    fn try_claim(&self, kind: JobKind) -> Result<Option<ClaimedJob>, QueueError> {
        let mut state = self.inner.lock().unwrap();
        let Some(raw) = state.pending.get_mut(&kind).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        let job = serde_json::from_str::<QueueJob>(&raw)
            .map_err(|e| QueueError::Serialization(e.to_string()))?;
        state.processing.entry(kind).or_default().push(raw.clone());
        Ok(Some(ClaimedJob { job, raw }))
    }

    fn remove_from_processing(&self, claimed: &ClaimedJob) {
        let mut state = self.inner.lock().unwrap();
        if let Some(list) = state.processing.get_mut(&claimed.job.kind()) {
            if let Some(pos) = list.iter().position(|raw| raw == &claimed.raw) {
                list.remove(pos);
            }
        }
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(&self, job: &QueueJob) -> Result<JobId, QueueError> {
        let payload = encode(job)?;
        self.inner
            .lock()
            .unwrap()
            .pending
            .entry(job.kind())
            .or_default()
            .push_back(payload);
        Ok(job.id)
    }

    async fn claim(&self, kind: JobKind, wait: Duration) -> Result<Option<ClaimedJob>, QueueError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(claimed) = self.try_claim(kind)? {
                return Ok(Some(claimed));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn ack(&self, claimed: &ClaimedJob) -> Result<(), QueueError> {
        self.remove_from_processing(claimed);
        Ok(())
    }

    async fn requeue(&self, claimed: &ClaimedJob) -> Result<(), QueueError> {
        let bumped = encode(&claimed.job.redelivered())?;
        self.remove_from_processing(claimed);
        self.inner
            .lock()
            .unwrap()
            .pending
            .entry(claimed.job.kind())
            .or_default()
            .push_back(bumped);
        Ok(())
    }

    async fn dead_letter(&self, claimed: &ClaimedJob, reason: &str) -> Result<(), QueueError> {
        self.remove_from_processing(claimed);
        self.inner.lock().unwrap().dead_letters.push(DeadLetterEntry {
            job: claimed.job.clone(),
            reason: reason.to_string(),
            dead_lettered_at: Utc::now(),
        });
        Ok(())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use visage_core::ScanId;

    use crate::job::JobPayload;

    fn score_job() -> QueueJob {
        QueueJob::new(JobPayload::ScoreScan {
            scan_id: ScanId::new(),
            frontal: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
            side: Some("data:image/jpeg;base64,/9j/4BBQ".to_string()),
        })
    }

    #[tokio::test]
    async fn claim_moves_job_to_processing_and_ack_removes_it() {
        let store = InMemoryQueueStore::new();
        let job = score_job();
        store.enqueue(&job).await.unwrap();

        let claimed = store
            .claim(JobKind::ScoreScan, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.job.id, job.id);
        assert_eq!(store.pending_len(JobKind::ScoreScan), 0);
        assert_eq!(store.processing_len(JobKind::ScoreScan), 1);

        store.ack(&claimed).await.unwrap();
        assert_eq!(store.processing_len(JobKind::ScoreScan), 0);
    }

    #[tokio::test]
    async fn claim_times_out_on_empty_queue() {
        let store = InMemoryQueueStore::new();
        let claimed = store
            .claim(JobKind::GenerateRoutine, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn requeue_bumps_delivery_counter() {
        let store = InMemoryQueueStore::new();
        store.enqueue(&score_job()).await.unwrap();

        let claimed = store
            .claim(JobKind::ScoreScan, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.job.deliveries, 0);
        store.requeue(&claimed).await.unwrap();

        let reclaimed = store
            .claim(JobKind::ScoreScan, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reclaimed.job.deliveries, 1);
        assert_eq!(reclaimed.job.id, claimed.job.id);
    }

    #[tokio::test]
    async fn dead_letter_records_reason() {
        let store = InMemoryQueueStore::new();
        store.enqueue(&score_job()).await.unwrap();

        let claimed = store
            .claim(JobKind::ScoreScan, Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        store
            .dead_letter(&claimed, "scoring service rejected image")
            .await
            .unwrap();

        let dls = store.dead_letters();
        assert_eq!(dls.len(), 1);
        assert_eq!(dls[0].reason, "scoring service rejected image");
        assert_eq!(store.processing_len(JobKind::ScoreScan), 0);
    }

    #[tokio::test]
    async fn kinds_are_isolated() {
        let store = InMemoryQueueStore::new();
        store.enqueue(&score_job()).await.unwrap();

        let claimed = store
            .claim(JobKind::GenerateRecommendations, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(claimed.is_none(), "wrong kind must not see the job");
    }
}
