//! Serve command - runs the gateway with graceful draining

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::create_router;
use crate::api::state::Lifecycle;
use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::observability;

/// Run the gateway server
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let prometheus = observability::init_metrics();
    let state = crate::create_app_state(&config, prometheus).await?;
    let lifecycle = state.lifecycle.clone();

    if config.debug_mode {
        warn!("DEBUG MODE ENABLED - admin cache routes exposed");
    }

    let app = create_router(state);
    let addr = build_socket_addr(&config)?;
    info!("Starting Sentinel gateway on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    let drain_timeout = Duration::from_secs(config.drain.timeout_seconds);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_and_drain(lifecycle, drain_timeout))
        .await?;

    // Clients drop with the state, reverse of startup order
    info!("Sentinel gateway shut down");
    Ok(())
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

/// Waits for a shutdown signal, then drains.
///
/// Setting the drain flag makes the ingress middleware refuse new requests;
/// in-flight requests get up to `drain_timeout` to finish before the server
/// is torn down.
async fn shutdown_and_drain(lifecycle: Arc<Lifecycle>, drain_timeout: Duration) {
    shutdown_signal().await;

    info!("Shutdown signal received, draining");
    lifecycle.begin_drain();

    let deadline = Instant::now() + drain_timeout;

    while lifecycle.in_flight() > 0 && Instant::now() < deadline {
        info!(
            in_flight = lifecycle.in_flight(),
            "Waiting for in-flight requests"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if lifecycle.in_flight() > 0 {
        warn!(
            in_flight = lifecycle.in_flight(),
            timeout_secs = drain_timeout.as_secs(),
            "Drain timeout reached with requests still active"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
