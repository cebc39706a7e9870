//! Environment-derived configuration.
//!
//! Absence of the queue backing store disables that subsystem instead of
//! failing startup; absence of the scoring URL defers the failure to the
//! call site as a configuration error.

use std::net::SocketAddr;

use visage_queue::QueueConfig;

/// Env var naming the queue backing-store connection string.
pub const QUEUE_REDIS_URL_VAR: &str = "QUEUE_REDIS_URL";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub queue: Option<QueueConfig>,
    pub scoring_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);

        let queue = std::env::var(QUEUE_REDIS_URL_VAR)
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .map(QueueConfig::new);

        let scoring_url = std::env::var(visage_scoring::client::SCORING_API_URL_VAR)
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            queue,
            scoring_url,
        }
    }
}
