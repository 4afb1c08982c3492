//! Vertica Backup Operator
//!
//! Main entry point for the operator. Sets up the Kubernetes client,
//! registers CRD controllers, and runs the reconciliation loops.

use std::sync::Arc;

use futures::FutureExt;
use kube::Client;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vertica_backup_operator::{
    config::OperatorConfig,
    controllers::{self, Context},
    metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Vertica Backup Operator");

    let config = OperatorConfig::from_env()?;
    info!(
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        metrics_port = config.metrics_port,
        status_update_attempts = config.status_update_attempts,
        requeue_interval_secs = config.requeue_interval_secs,
        "Loaded configuration"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let shutdown = CancellationToken::new();
    let metrics_port = config.metrics_port;
    let context = Arc::new(Context::new(client, config, shutdown.clone()));

    let metrics_handle = tokio::spawn(metrics::serve(metrics_port, shutdown.clone()));

    let running = vec![
        controllers::run_archive_controller(context.clone()).boxed_local(),
        controllers::run_backup_controller(context.clone()).boxed_local(),
        controllers::run_restore_controller(context.clone()).boxed_local(),
        async {
            match metrics_handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Metrics server failed"),
                Err(e) => error!(error = %e, "Metrics server task panicked"),
            }
        }
        .boxed_local(),
    ];
    let signal = async {
        shutdown_signal().await;
        info!("Received shutdown signal, cancelling in-flight reconciles");
        metrics::OPERATOR_HEALTH.set(0.0);
    };

    if !controllers::run_until_signal(running, signal, &shutdown).await {
        error!("A controller or the metrics server exited unexpectedly");
    }

    metrics::OPERATOR_HEALTH.set(0.0);
    shutdown.cancel();

    info!("Vertica Backup Operator stopped");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kube=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
