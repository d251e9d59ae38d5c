//! Collection cycle
//!
//! Drives the periodic loop: list nodes and pods, fetch each node's
//! kubelet or cAdvisor exposition text, aggregate it, and publish the
//! per-node gauges.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::exposition::{
    aggregate_usage, UsageTotals, CPU_USAGE_FAMILY, MEMORY_WORKING_SET_FAMILY,
};
use crate::metrics::ExporterMetrics;
use crate::pods::{count_active_pods, PhaseFilter, PodInfo};

/// Which per-node endpoint the collector fetches usage from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeTarget {
    /// The kubelet's own `/metrics` endpoint
    Kubelet,
    /// The embedded cAdvisor endpoint (container-level usage)
    #[default]
    Cadvisor,
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeTarget::Kubelet => write!(f, "kubelet"),
            ScrapeTarget::Cadvisor => write!(f, "cadvisor"),
        }
    }
}

impl FromStr for ScrapeTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubelet" => Ok(ScrapeTarget::Kubelet),
            "cadvisor" => Ok(ScrapeTarget::Cadvisor),
            other => Err(format!(
                "unknown scrape target '{}', expected 'kubelet' or 'cadvisor'",
                other
            )),
        }
    }
}

/// Errors from one collection cycle
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to list nodes: {0}")]
    ListNodes(String),

    #[error("failed to list pods: {0}")]
    ListPods(String),

    #[error("failed to fetch {target} metrics: {message}")]
    ProxyFetch { target: String, message: String },

    #[error("metrics stream error: {0}")]
    Stream(#[from] std::io::Error),
}

/// Trait over the cluster the collector observes
#[async_trait::async_trait]
pub trait ClusterSource: Send + Sync {
    /// Names of all nodes currently registered in the cluster
    async fn node_names(&self) -> Result<Vec<String>, ScrapeError>;

    /// Scheduling and phase info for all pods in the cluster
    async fn pods(&self) -> Result<Vec<PodInfo>, ScrapeError>;

    /// Raw exposition text from one node's metrics endpoint
    async fn node_metrics(&self, node: &str, target: ScrapeTarget)
        -> Result<String, ScrapeError>;
}

/// Outcome counts from one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Nodes listed this cycle
    pub nodes: usize,
    /// Nodes whose metrics fetch failed
    pub failures: usize,
    /// Active pods summed over all nodes
    pub active_pods: u64,
}

/// Periodic metrics collector
pub struct Collector<S: ClusterSource> {
    source: Arc<S>,
    metrics: Arc<ExporterMetrics>,
    target: ScrapeTarget,
    phase_filter: PhaseFilter,
    interval: Duration,
    published: HashSet<String>,
}

impl<S: ClusterSource> Collector<S> {
    /// Create a new collector
    pub fn new(
        source: Arc<S>,
        metrics: Arc<ExporterMetrics>,
        target: ScrapeTarget,
        phase_filter: PhaseFilter,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            metrics,
            target,
            phase_filter,
            interval,
            published: HashSet::new(),
        }
    }

    /// Run the collection loop until shutdown is signalled.
    ///
    /// The first cycle runs immediately rather than one interval after
    /// startup.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval = ?self.interval,
            target = %self.target,
            "Starting collector"
        );

        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.collect_cycle().await {
                        error!(error = %e, "Collection cycle failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Shutdown signal received, stopping collector");
                        break;
                    }
                }
            }
        }
    }

    /// Run one collection cycle.
    ///
    /// A failed list call aborts the cycle and leaves the gauges at their
    /// previous values. A failed per-node fetch only degrades that node:
    /// usage gauges drop to zero while the pod gauge and the error counter
    /// still update.
    pub async fn collect_cycle(&mut self) -> Result<CycleSummary, ScrapeError> {
        let start = Instant::now();

        let nodes = self.source.node_names().await?;
        let pods = self.source.pods().await?;
        let counts = count_active_pods(pods, &self.phase_filter);

        let mut summary = CycleSummary {
            nodes: nodes.len(),
            ..Default::default()
        };
        let mut seen = HashSet::with_capacity(nodes.len());

        for node in nodes {
            let active = counts.get(&node).copied().unwrap_or(0);
            summary.active_pods += active;

            let usage = match self.fetch_usage(&node).await {
                Ok(usage) => usage,
                Err(e) => {
                    warn!(
                        node = %node,
                        target = %self.target,
                        error = %e,
                        "Metrics fetch failed, publishing zero usage"
                    );
                    self.metrics
                        .inc_scrape_error(&format!("{}:{}", self.target, node));
                    summary.failures += 1;
                    UsageTotals::default()
                }
            };

            self.metrics.publish_node(&node, &usage, active);
            seen.insert(node);
        }

        for node in self.published.difference(&seen) {
            debug!(node = %node, "Node left the cluster, dropping its series");
            self.metrics.remove_node(node);
        }
        self.published = seen;

        debug!(
            nodes = summary.nodes,
            failures = summary.failures,
            active_pods = summary.active_pods,
            duration = ?start.elapsed(),
            "Collection cycle complete"
        );

        Ok(summary)
    }

    /// Run a single collection cycle (for --once mode)
    pub async fn run_once(&mut self) -> Result<CycleSummary, ScrapeError> {
        info!("Running single collection cycle");
        self.collect_cycle().await
    }

    async fn fetch_usage(&self, node: &str) -> Result<UsageTotals, ScrapeError> {
        let body = self.source.node_metrics(node, self.target).await?;
        let totals = aggregate_usage(
            body.as_bytes(),
            CPU_USAGE_FAMILY,
            MEMORY_WORKING_SET_FAMILY,
        )?;
        Ok(totals)
    }
}
