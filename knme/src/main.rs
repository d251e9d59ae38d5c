//! Kubernetes Node Metrics Exporter (KNME)
//!
//! Periodically lists cluster nodes and pods, fetches each node's kubelet
//! or cAdvisor metrics through the API server proxy, and re-exposes the
//! aggregated per-node usage as Prometheus gauges.

mod cli;
mod config;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use config::Config;
use knme_core::collector::Collector;
use knme_core::metrics::ExporterMetrics;
use knme_core::pods::PhaseFilter;
use knme_k8s::client::K8sClient;
use knme_k8s::scraper::ProxyScraper;

/// Initialize the tracing/logging subsystem
fn init_logging(log_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(&cli.log_level, cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "KNME starting");

    // Load configuration
    let mut config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("Failed to load config from {:?}", cli.config))?
    } else {
        warn!(path = ?cli.config, "Config file not found, using defaults");
        Config::default()
    };

    // Apply CLI overrides
    if let Some(listen_address) = cli.listen_address {
        config.listen_address = listen_address;
    }
    if let Some(interval) = cli.scrape_interval {
        config.scrape_interval = interval;
    }
    if let Some(target) = cli.target {
        config.target = target;
    }
    if let Some(phases) = cli.exclude_phases {
        config.exclude_phases = phases;
    }

    // Validate configuration
    config.validate().context("Invalid configuration")?;

    info!(
        interval = %humantime::format_duration(config.scrape_interval),
        target = %config.target,
        listen = %config.listen_address,
        "Configuration loaded"
    );

    // Connect to the API server and fail fast if it is unreachable
    let k8s_client = K8sClient::new().await?;
    k8s_client
        .health_check()
        .await
        .context("Kubernetes API server is not reachable")?;

    let metrics =
        Arc::new(ExporterMetrics::new().context("Failed to build metrics registry")?);
    let scraper = Arc::new(ProxyScraper::new(k8s_client, config.fetch_timeout));
    let mut collector = Collector::new(
        scraper,
        metrics.clone(),
        config.target,
        PhaseFilter::new(&config.exclude_phases),
        config.scrape_interval,
    );

    // Run a single cycle and exit if --once flag is set
    if cli.once {
        let summary = collector.run_once().await?;
        info!(
            nodes = summary.nodes,
            failures = summary.failures,
            active_pods = summary.active_pods,
            "Single collection cycle complete"
        );
        return Ok(());
    }

    // Setup shutdown signal handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, initiating shutdown");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating shutdown");
            }
        }

        let _ = shutdown_tx.send(true);
    });

    // Serve /metrics and /healthz for the lifetime of the process
    let listen_addr = config.listen_addr()?;
    let server_metrics = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(listen_addr, server_metrics).await {
            error!(error = %e, "Metrics server failed");
        }
    });

    // Run the collection loop
    collector.run(shutdown_rx).await;

    info!("KNME shutdown complete");
    Ok(())
}
