//! Prometheus metrics for KNME
//!
//! All exporter families live in an explicit registry. `/metrics` serves
//! only what the collector publishes, never the process-level defaults.

use prometheus::proto::MetricFamily;
use prometheus::{opts, GaugeVec, IntCounterVec, Registry, TextEncoder};

use crate::exposition::UsageTotals;

/// Registry wrapper holding the per-node gauge families.
pub struct ExporterMetrics {
    registry: Registry,
    node_cpu_usage: GaugeVec,
    node_memory_usage: GaugeVec,
    node_active_pods: GaugeVec,
    scrape_errors: IntCounterVec,
}

impl ExporterMetrics {
    /// Create the registry and register all families into it.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let node_cpu_usage = GaugeVec::new(
            opts!(
                "k8s_node_cpu_usage_cores",
                "Aggregated CPU usage (cores) per node from kubelet/cAdvisor."
            ),
            &["node"],
        )?;
        registry.register(Box::new(node_cpu_usage.clone()))?;

        let node_memory_usage = GaugeVec::new(
            opts!(
                "k8s_node_memory_usage_bytes",
                "Aggregated memory working set (bytes) per node from kubelet/cAdvisor."
            ),
            &["node"],
        )?;
        registry.register(Box::new(node_memory_usage.clone()))?;

        let node_active_pods = GaugeVec::new(
            opts!(
                "k8s_node_active_pods",
                "Number of non-terminal pods per node."
            ),
            &["node"],
        )?;
        registry.register(Box::new(node_active_pods.clone()))?;

        let scrape_errors = IntCounterVec::new(
            opts!("knme_scrape_errors_total", "Total scrape errors by target."),
            &["target"],
        )?;
        registry.register(Box::new(scrape_errors.clone()))?;

        Ok(Self {
            registry,
            node_cpu_usage,
            node_memory_usage,
            node_active_pods,
            scrape_errors,
        })
    }

    /// Set all three gauges for one node.
    pub fn publish_node(&self, node: &str, usage: &UsageTotals, active_pods: u64) {
        self.node_cpu_usage
            .with_label_values(&[node])
            .set(usage.cpu_cores);
        self.node_memory_usage
            .with_label_values(&[node])
            .set(usage.memory_bytes);
        self.node_active_pods
            .with_label_values(&[node])
            .set(active_pods as f64);
    }

    /// Drop the series of a node that left the cluster.
    pub fn remove_node(&self, node: &str) {
        // Removal only fails for a series that was never published.
        let _ = self.node_cpu_usage.remove_label_values(&[node]);
        let _ = self.node_memory_usage.remove_label_values(&[node]);
        let _ = self.node_active_pods.remove_label_values(&[node]);
    }

    /// Increment the scrape error counter for a target.
    pub fn inc_scrape_error(&self, target: &str) {
        self.scrape_errors.with_label_values(&[target]).inc();
    }

    /// Snapshot of all registered families.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render the registry in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
