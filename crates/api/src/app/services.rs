//! Infrastructure wiring for the HTTP application.

use std::sync::Arc;

use tracing::warn;

use visage_queue::{JobHandler, QueueSupervisor};
use visage_scoring::ScoringClient;

use crate::config::AppConfig;

use super::store::{InMemoryScanStore, ScanStore};
use super::workers::{RecommendationsWorker, RoutineWorker, ScoreScanWorker};

/// Long-lived services shared by routes and workers.
pub struct AppServices {
    pub scoring: ScoringClient,
    pub supervisor: QueueSupervisor,
    pub scans: Arc<dyn ScanStore>,
}

impl AppServices {
    pub fn new(
        scoring: ScoringClient,
        supervisor: QueueSupervisor,
        scans: Arc<dyn ScanStore>,
    ) -> Self {
        Self {
            scoring,
            supervisor,
            scans,
        }
    }
}

pub fn build_services(config: &AppConfig) -> AppServices {
    let scoring = match &config.scoring_url {
        Some(url) => ScoringClient::new(url),
        None => {
            warn!("SCORING_API_URL not set; scoring calls will fail fast");
            ScoringClient::unconfigured()
        }
    };

    AppServices::new(
        scoring,
        QueueSupervisor::new(config.queue.clone()),
        Arc::new(InMemoryScanStore::new()),
    )
}

/// One handler per registered job kind.
pub fn job_handlers(services: &Arc<AppServices>) -> Vec<Arc<dyn JobHandler>> {
    vec![
        Arc::new(ScoreScanWorker::new(
            services.scoring.clone(),
            services.scans.clone(),
        )),
        Arc::new(RecommendationsWorker::new(services.scans.clone())),
        Arc::new(RoutineWorker::new(services.scans.clone())),
    ]
}
