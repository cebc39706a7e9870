//! HTTP API application wiring (Axum router + service wiring).
//!
//! Folder layout:
//! - `services.rs`: infrastructure wiring (scoring client, queue supervisor, scan store)
//! - `workers.rs`: background job handlers run by the queue supervisor
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod store;
pub mod workers;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/health/queue", get(routes::system::queue_health))
        .route("/health/scoring", get(routes::system::scoring_health))
        .merge(routes::router())
        .layer(
            // Correlation first (outermost): every handler and layer below
            // runs inside the request's correlation scope.
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::correlation_middleware))
                .layer(Extension(services)),
        )
}
