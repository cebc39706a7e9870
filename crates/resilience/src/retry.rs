//! Bounded retries with exponential backoff and jitter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use visage_core::{CorrelationId, UpstreamError, UpstreamResult};

use crate::context::current_correlation_id;

/// Decides whether a failed attempt may be retried.
pub type Classifier = Arc<dyn Fn(&UpstreamError) -> bool + Send + Sync>;

/// Invoked before each retry sleep with `(attempt, error, delay)`.
pub type RetryObserver = Arc<dyn Fn(u32, &UpstreamError, Duration) + Send + Sync>;

/// Jitter fraction is drawn uniformly from `[0, JITTER_MAX)`.
const JITTER_MAX: f64 = 0.3;

/// Retry policy for one logical upstream call.
///
/// Immutable once constructed; cheap to clone and reuse across many
/// invocations. Retries are purely in-memory within one call, nothing is
/// persisted between attempts.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    classifier: Classifier,
    on_retry: Option<RetryObserver>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    /// Create a policy with the default transient classifier
    /// ([`UpstreamError::is_transient`]: 429, 5xx, network, timeout).
    ///
    /// `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            classifier: Arc::new(UpstreamError::is_transient),
            on_retry: None,
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Replace the retryability classifier.
    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&UpstreamError) -> bool + Send + Sync + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Observe each retry decision instead of the default diagnostic log.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &UpstreamError, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff delay before attempt `attempt + 1`, for 1-indexed `attempt`:
    /// `min(max_delay, base_delay * 2^(attempt-1) * (1 + jitter))`.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let exp = 2_f64.powi(attempt.saturating_sub(1).min(62) as i32);
        let jitter = rand::thread_rng().gen_range(0.0..JITTER_MAX);
        let delay_ms = (base_ms * exp * (1.0 + jitter)).min(max_ms);
        Duration::from_millis(delay_ms as u64)
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts are
    /// exhausted.
    ///
    /// Attempts are strictly sequential; the backoff sleep suspends only this
    /// logical call. The last observed error is propagated unchanged — never
    /// swallowed, never wrapped.
    pub async fn execute<T, Op, Fut>(&self, mut operation: Op) -> UpstreamResult<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = UpstreamResult<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !(self.classifier)(&err) || attempt >= self.max_attempts {
                        return Err(err);
                    }

                    let delay = self.delay_for_attempt(attempt);
                    match &self.on_retry {
                        Some(observer) => observer(attempt, &err, delay),
                        None => {
                            let correlation = current_correlation_id();
                            warn!(
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                correlation_id = correlation.as_ref().map(CorrelationId::as_str),
                                error = %err,
                                "upstream call failed, retrying after backoff"
                            );
                        }
                    }

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
