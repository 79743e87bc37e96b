//! Exporter lifecycle: configuration, logging, serving and shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use crate::args::ExporterArgs;
use crate::collector::ScrapeCollector;
use crate::config::ExporterConfig;
use crate::http::HttpServer;
use crate::init_tracing;
use crate::profile::ExporterProfile;

/// Run the exporter described by `profile` until Ctrl+C or SIGTERM.
///
/// Parses the process arguments, so this is meant to be the whole body of an
/// exporter's `main`.
pub async fn run_exporter(profile: &ExporterProfile) -> anyhow::Result<()> {
    let args = ExporterArgs::parse_for(profile);
    let config = args.load_config()?;
    config.validate(profile)?;

    init_tracing(&config.logging)?;

    serve(profile, &config).await
}

/// Serve `profile` with an already loaded configuration.
pub async fn serve(profile: &ExporterProfile, config: &ExporterConfig) -> anyhow::Result<()> {
    info!(
        exporter = profile.namespace,
        version = env!("CARGO_PKG_VERSION"),
        "Starting {}",
        profile.title
    );

    let listen_addr = config.listen_addr(profile)?;
    let collector = Arc::new(ScrapeCollector::new(profile, config)?);

    info!(
        upstream = %collector.upstream_url(),
        metrics = collector.describe().len(),
        labels = config.labels.len(),
        "Registered metrics"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(
        collector.clone(),
        listen_addr,
        config.web.path.clone(),
        profile.title,
    );
    let mut http_task = tokio::spawn(async move { http_server.run(shutdown_rx).await });

    tokio::select! {
        result = &mut http_task => {
            // The server only returns on its own when it failed to start or serve
            let result = result.map_err(|e| anyhow::anyhow!("HTTP server task failed: {}", e))?;
            if let Err(e) = &result {
                error!(error = %e, "HTTP server error");
            }
            return result;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    let stats = collector.stats();
    info!(
        scrapes = stats.scrapes,
        failures = stats.failures,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
