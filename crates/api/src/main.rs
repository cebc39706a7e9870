use std::sync::Arc;

use anyhow::Context;

use visage_api::app::{self, services};
use visage_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    visage_observability::init();

    let config = AppConfig::from_env();
    let services = Arc::new(services::build_services(&config));

    // Boot the worker pool before accepting traffic. A missing or unreachable
    // backing store leaves the HTTP surface up with the queue degraded.
    services
        .supervisor
        .boot(services::job_handlers(&services))
        .await;

    let app = app::build_app(services.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    // Drain workers after the listener closes so in-flight jobs finish or
    // land back on the queue.
    services.supervisor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining");
}
