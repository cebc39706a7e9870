//! HTTP client for the remote scoring microservice.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use visage_core::{UpstreamError, UpstreamResult};
use visage_resilience::{RetryPolicy, with_timeout};

use crate::result::ScoreResult;

/// Env var naming the scoring service base URL.
pub const SCORING_API_URL_VAR: &str = "SCORING_API_URL";

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// How much of an upstream error body is kept for diagnostics.
const MAX_DIAGNOSTIC_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct HealthResponse {
    model_loaded: bool,
}

/// Client for the scoring microservice.
///
/// Every scoring call runs under a fixed per-call deadline and the default
/// transient retry classifier. A missing base URL fails fast with a
/// configuration error — no call is attempted.
#[derive(Debug, Clone)]
pub struct ScoringClient {
    base_url: Option<String>,
    http: reqwest::Client,
    call_timeout: Duration,
    health_timeout: Duration,
    retry: RetryPolicy,
}

impl ScoringClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            http: reqwest::Client::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Client with no base URL: every operation fails with a configuration
    /// error at the call site, so the host process still boots.
    pub fn unconfigured() -> Self {
        Self {
            base_url: None,
            http: reqwest::Client::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Build from `SCORING_API_URL`; unset falls back to
    /// [`ScoringClient::unconfigured`].
    pub fn from_env() -> Self {
        match std::env::var(SCORING_API_URL_VAR) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim().trim_end_matches('/')),
            _ => Self::unconfigured(),
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn base_url(&self) -> UpstreamResult<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| UpstreamError::configuration(format!("{SCORING_API_URL_VAR} is not set")))
    }

    /// Score a single facial image.
    pub async fn score_image(&self, image: Vec<u8>) -> UpstreamResult<ScoreResult> {
        let url = format!("{}/score", self.base_url()?);
        self.execute_scoring_call(|| {
            let form =
                Form::new().part("image", Part::bytes(image.clone()).file_name("image.jpg"));
            self.http.post(&url).multipart(form)
        })
        .await
    }

    /// Score a frontal/side image pair.
    pub async fn score_image_pair(
        &self,
        frontal: Vec<u8>,
        side: Vec<u8>,
    ) -> UpstreamResult<ScoreResult> {
        let url = format!("{}/score/pair", self.base_url()?);
        self.execute_scoring_call(|| {
            let form = Form::new()
                .part("frontal", Part::bytes(frontal.clone()).file_name("frontal.jpg"))
                .part("side", Part::bytes(side.clone()).file_name("side.jpg"));
            self.http.post(&url).multipart(form)
        })
        .await
    }

    /// Score an image supplied as a base64 data URL.
    pub async fn score_data_url(&self, data_url: &str) -> UpstreamResult<ScoreResult> {
        let url = format!("{}/score/base64", self.base_url()?);
        self.execute_scoring_call(|| {
            self.http
                .post(&url)
                .form(&[("data_url", data_url)])
        })
        .await
    }

    /// Score a frontal/side pair supplied as base64 data URLs.
    pub async fn score_pair_data_urls(
        &self,
        front: &str,
        side: &str,
    ) -> UpstreamResult<ScoreResult> {
        let url = format!("{}/score/pair-bytes", self.base_url()?);
        self.execute_scoring_call(|| {
            self.http
                .post(&url)
                .form(&[("front", front), ("side", side)])
        })
        .await
    }

    /// Short-timeout probe. True only when the service is reachable *and*
    /// reports its model as loaded — reachable-but-unloaded reads as
    /// unhealthy.
    pub async fn check_health(&self) -> bool {
        let Ok(base) = self.base_url() else {
            return false;
        };
        let url = format!("{base}/health");

        let result: UpstreamResult<bool> = with_timeout(self.health_timeout, |_cancel| async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(map_transport_error)?;

            if !response.status().is_success() {
                return Ok(false);
            }

            let health: HealthResponse = response
                .json()
                .await
                .map_err(|e| UpstreamError::malformed(e.to_string()))?;
            Ok(health.model_loaded)
        })
        .await;

        match result {
            Ok(loaded) => loaded,
            Err(e) => {
                debug!(error = %e, "scoring health probe failed");
                false
            }
        }
    }

    /// One retried, deadline-bounded call. The request is rebuilt per attempt
    /// (multipart bodies are single-use).
    async fn execute_scoring_call<MakeReq>(&self, make_request: MakeReq) -> UpstreamResult<ScoreResult>
    where
        MakeReq: Fn() -> reqwest::RequestBuilder,
    {
        self.retry
            .execute(|| {
                let request = make_request();
                async move {
                    // Dropping the in-flight request on deadline aborts the
                    // underlying connection, so the token needs no extra wiring.
                    with_timeout(self.call_timeout, |_cancel| async move {
                        let response = request.send().await.map_err(map_transport_error)?;
                        read_score_response(response).await
                    })
                    .await
                }
            })
            .await
    }
}

async fn read_score_response(response: reqwest::Response) -> UpstreamResult<ScoreResult> {
    let status = response.status();
    if !status.is_success() {
        // Read the body before failing: upstream error details are the only
        // clue to what the model rejected.
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::from_status(status.as_u16(), truncate(&body)));
    }

    let result: ScoreResult = response
        .json()
        .await
        .map_err(|e| UpstreamError::malformed(e.to_string()))?;
    result.validate()?;
    Ok(result)
}

fn map_transport_error(err: reqwest::Error) -> UpstreamError {
    UpstreamError::network(err.to_string())
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_DIAGNOSTIC_BODY {
        body.to_string()
    } else {
        let mut end = MAX_DIAGNOSTIC_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_base_url_fails_fast_without_a_call() {
        let client = ScoringClient::unconfigured();

        let result = client.score_image(vec![1, 2, 3]).await;
        assert!(matches!(result, Err(UpstreamError::Configuration(_))));

        assert!(!client.check_health().await);
    }

    #[test]
    fn diagnostic_bodies_are_truncated() {
        let long = "x".repeat(2 * MAX_DIAGNOSTIC_BODY);
        let kept = truncate(&long);
        assert!(kept.len() < long.len());
        assert!(kept.ends_with('…'));

        assert_eq!(truncate("short"), "short");
    }
}
