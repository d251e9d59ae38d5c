//! Cluster scraping through the API server proxy
//!
//! Implements the collector's cluster source on top of the Kubernetes
//! client: node and pod listings plus per-node exposition text fetched
//! via `/api/v1/nodes/{name}/proxy/...`.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use tracing::debug;

use knme_core::collector::{ClusterSource, ScrapeError, ScrapeTarget};
use knme_core::pods::PodInfo;

use crate::client::K8sClient;

/// Proxy subpath serving a target's exposition text.
fn proxy_subpath(target: ScrapeTarget) -> &'static str {
    match target {
        ScrapeTarget::Kubelet => "metrics",
        ScrapeTarget::Cadvisor => "metrics/cadvisor",
    }
}

/// Project a pod down to the fields the collector tallies.
pub fn pod_info(pod: Pod) -> PodInfo {
    PodInfo {
        node: pod.spec.and_then(|spec| spec.node_name),
        phase: pod.status.and_then(|status| status.phase),
    }
}

/// Cluster source backed by the API server proxy
pub struct ProxyScraper {
    client: K8sClient,
    fetch_timeout: Duration,
}

impl ProxyScraper {
    /// Create a new proxy scraper
    pub fn new(client: K8sClient, fetch_timeout: Duration) -> Self {
        Self {
            client,
            fetch_timeout,
        }
    }
}

#[async_trait]
impl ClusterSource for ProxyScraper {
    async fn node_names(&self) -> Result<Vec<String>, ScrapeError> {
        let nodes = self
            .client
            .list_nodes()
            .await
            .map_err(|e| ScrapeError::ListNodes(format!("{:#}", e)))?;

        Ok(nodes
            .into_iter()
            .filter_map(|node| node.metadata.name)
            .collect())
    }

    async fn pods(&self) -> Result<Vec<PodInfo>, ScrapeError> {
        let pods = self
            .client
            .list_pods()
            .await
            .map_err(|e| ScrapeError::ListPods(format!("{:#}", e)))?;

        Ok(pods.into_iter().map(pod_info).collect())
    }

    async fn node_metrics(
        &self,
        node: &str,
        target: ScrapeTarget,
    ) -> Result<String, ScrapeError> {
        let subpath = proxy_subpath(target);
        debug!(node = %node, subpath = subpath, "Fetching node metrics via API proxy");

        match tokio::time::timeout(
            self.fetch_timeout,
            self.client.node_proxy_text(node, subpath),
        )
        .await
        {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => Err(ScrapeError::ProxyFetch {
                target: format!("{}:{}", target, node),
                message: format!("{:#}", e),
            }),
            Err(_) => Err(ScrapeError::ProxyFetch {
                target: format!("{}:{}", target, node),
                message: format!("timed out after {:?}", self.fetch_timeout),
            }),
        }
    }
}
