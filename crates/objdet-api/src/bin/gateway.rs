//! Gateway binary.

use anyhow::{anyhow, Context};
use tracing::{error, info, warn};

use objdet_api::{create_gateway_router, metrics, telemetry, GatewayConfig, GatewayState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    info!("Starting objdet-gateway");

    let config = GatewayConfig::from_env();
    config.validate().map_err(|e| anyhow!(e))?;
    info!(
        host = %config.host,
        port = config.port,
        detection_service = %config.client.base_url,
        detect_timeout_secs = config.client.detect_timeout.as_secs(),
        "Gateway config"
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
    let state = GatewayState::new(config).context("failed to build detection client")?;
    let app = create_gateway_router(state, metrics_handle);

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
