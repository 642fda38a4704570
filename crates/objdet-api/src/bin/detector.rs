//! Detection service binary.

use anyhow::Context;
use tracing::{error, info, warn};

use objdet_api::{create_detector_router, metrics, telemetry, DetectorConfig, DetectorState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    info!("Starting objdet-detector");

    let config = DetectorConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        output_dir = %config.output_dir.display(),
        model_path = %config.model_path,
        "Detector config"
    );

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Failed to install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    let (host, port) = (config.host.clone(), config.port);
    let state = DetectorState::new(config)
        .await
        .context("failed to open result store")?;

    let app = create_detector_router(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
