//! Upstream error taxonomy.
//!
//! Every failure that crosses the orchestration boundary is classified into
//! one of these variants *at the transport layer*, so retry decisions are
//! structural rather than guessed from message text. Keep this focused on
//! failures of external collaborators; domain validation belongs elsewhere.

use std::time::Duration;

use thiserror::Error;

/// Result type used across the orchestration layer.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// A failure observed while calling an external collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// A required endpoint or credential is missing. Fatal at the call site,
    /// never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The upstream rate-limited us (HTTP 429).
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    /// The upstream reported a server-side failure (HTTP 5xx).
    #[error("upstream service error (status {status}): {message}")]
    Service { status: u16, message: String },

    /// The upstream rejected the request (4xx other than 429). Retrying
    /// would produce the same rejection.
    #[error("upstream rejected request (status {status}): {message}")]
    Request { status: u16, message: String },

    /// Network-level failure: connection reset/refused, DNS, broken pipe.
    #[error("network error: {0}")]
    Network(String),

    /// The per-call deadline elapsed before the operation settled.
    #[error("operation timed out after {budget:?}")]
    Timeout { budget: Duration },

    /// The upstream answered, but the body did not match the contract.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    /// The queue backing store is unreachable or not configured.
    #[error("queue unavailable: {0}")]
    QueueUnavailable(String),
}

impl UpstreamError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn queue_unavailable(msg: impl Into<String>) -> Self {
        Self::QueueUnavailable(msg.into())
    }

    /// Classify an HTTP status into the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Self::RateLimited(message),
            s if s >= 500 => Self::Service { status: s, message },
            s => Self::Request { status: s, message },
        }
    }

    /// The upstream HTTP status embedded in this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited(_) => Some(429),
            Self::Service { status, .. } | Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// This is the default-deny classifier: rate limits, 5xx, network-class
    /// failures, and timeouts are transient; everything else is terminal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Service { .. } | Self::Network(_) | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            UpstreamError::from_status(429, "slow down"),
            UpstreamError::RateLimited(_)
        ));
        assert!(matches!(
            UpstreamError::from_status(503, "unavailable"),
            UpstreamError::Service { status: 503, .. }
        ));
        assert!(matches!(
            UpstreamError::from_status(404, "no such model"),
            UpstreamError::Request { status: 404, .. }
        ));
    }

    #[test]
    fn transient_set_is_exactly_429_5xx_network_timeout() {
        assert!(UpstreamError::from_status(429, "").is_transient());
        assert!(UpstreamError::from_status(500, "").is_transient());
        assert!(UpstreamError::network("connection refused").is_transient());
        assert!(
            UpstreamError::Timeout {
                budget: Duration::from_secs(5)
            }
            .is_transient()
        );

        assert!(!UpstreamError::from_status(400, "").is_transient());
        assert!(!UpstreamError::configuration("missing SCORING_API_URL").is_transient());
        assert!(!UpstreamError::malformed("score out of range").is_transient());
        assert!(!UpstreamError::queue_unavailable("no backing store").is_transient());
    }

    #[test]
    fn status_is_preserved_for_diagnostics() {
        assert_eq!(UpstreamError::from_status(502, "bad gateway").status(), Some(502));
        assert_eq!(UpstreamError::network("reset").status(), None);
    }
}
