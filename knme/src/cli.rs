//! CLI argument parsing for KNME

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use knme_core::collector::ScrapeTarget;

/// Kubernetes Node Metrics Exporter - per-node usage gauges from kubelet/cAdvisor
#[derive(Debug, Parser)]
#[command(name = "knme")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/knme/config.yaml")]
    pub config: PathBuf,

    /// Address to serve metrics on (overrides config)
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Interval between collection cycles, e.g. 30s or 1m (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub scrape_interval: Option<Duration>,

    /// Endpoint to scrape: kubelet or cadvisor (overrides config)
    #[arg(long)]
    pub target: Option<ScrapeTarget>,

    /// Comma-separated pod phases excluded from the active count (overrides config)
    #[arg(long, value_delimiter = ',')]
    pub exclude_phases: Option<Vec<String>>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "KNME_LOG_LEVEL")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long, default_value = "false", env = "KNME_LOG_JSON")]
    pub log_json: bool,

    /// Run a single collection cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
