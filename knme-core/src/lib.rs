//! KNME Core Library
//!
//! Core aggregation logic for the Kubernetes Node Metrics Exporter.
//! This crate provides exposition-format parsing, pod tallies, the
//! collection loop, and the Prometheus registry it publishes into.

pub mod collector;
pub mod exposition;
pub mod metrics;
pub mod pods;

// Re-export common types
pub use collector::{ClusterSource, Collector, CycleSummary, ScrapeError, ScrapeTarget};
pub use exposition::{aggregate_usage, UsageTotals};
pub use metrics::ExporterMetrics;
pub use pods::{count_active_pods, PhaseFilter, PodInfo};
