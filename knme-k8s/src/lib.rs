//! KNME Kubernetes Integration
//!
//! Provides the Kubernetes client and API server proxy scraping for the
//! Kubernetes Node Metrics Exporter.

pub mod client;
pub mod scraper;

pub use client::K8sClient;
pub use scraper::ProxyScraper;
