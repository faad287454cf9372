use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Router};
use kube::Client;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use backup_harness::api::RestBackupClient;
use backup_harness::cluster::KubeCluster;
use backup_harness::config::HarnessConfig;
use backup_harness::metrics::HarnessMetrics;
use backup_harness::{suites, Context};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kube=warn".into()),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting backup-harness"
    );

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HARNESS_CONFIG").ok())
        .map(PathBuf::from);
    let config = Arc::new(HarnessConfig::load(config_path.as_deref())?);

    let selected = suites::select(&config.suites)?;
    if selected.is_empty() {
        warn!(focus = ?config.suites.focus, skip = ?config.suites.skip, "No suites selected");
        return Ok(());
    }

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let metrics = Arc::new(HarnessMetrics::new());
    let ctx = Context::new(
        Arc::new(RestBackupClient::new(&config.api)?),
        Arc::new(KubeCluster::new(client)),
        Arc::clone(&config),
        Arc::clone(&metrics),
    );

    // Health and metrics server, stopped once the suites finish
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = config.metrics_addr.map(|addr| {
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            let app = Router::new()
                .route("/healthz", get(|| async { "ok" }))
                .route("/readyz", get(|| async { "ok" }))
                .route(
                    "/metrics",
                    get(move || {
                        let state = Arc::clone(&metrics);
                        async move { state.gather() }
                    }),
                );

            info!(%addr, "Starting health/metrics server");
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!(%addr, error = %e, "Failed to bind health/metrics server");
                    return;
                }
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await
            {
                error!(error = %e, "Health/metrics server error");
            }
        })
    });

    let report = tokio::select! {
        report = suites::run_all(&ctx, &selected) => report,
        _ = shutdown_signal() => {
            anyhow::bail!("interrupted before all suites finished");
        }
    };

    let _ = stop_tx.send(());
    if let Some(server) = server {
        let _ = server.await;
    }

    if let Some(path) = &config.report_path {
        report.write_to(path)?;
    }

    if !report.passed() {
        anyhow::bail!("failed suites: {}", report.failed_suites().join(", "));
    }
    info!(suites = report.suites.len(), "All suites passed");
    Ok(())
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
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
