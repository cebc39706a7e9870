use axum::Router;
use axum::routing::{get, post};

pub mod routines;
pub mod scans;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/scans", post(scans::submit_scan))
        .route("/scans/:scan_id", get(scans::get_scan))
        .route(
            "/scans/:scan_id/recommendations",
            post(scans::submit_recommendations).get(scans::get_recommendations),
        )
        .route("/routines", post(routines::submit_routine))
        .route("/routines/:user_id", get(routines::get_routine))
}
