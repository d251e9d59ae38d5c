//! Kubernetes Client wrapper
//!
//! Provides a simplified interface to the Kubernetes API.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams};
use kube::{Client, Config};
use tracing::info;

/// Kubernetes client wrapper
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Create a new K8s client using in-cluster or kubeconfig defaults
    pub async fn new() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;

        info!("Connected to Kubernetes API server");
        Ok(Self { client })
    }

    /// Create a new K8s client with custom config
    pub async fn with_config(config: Config) -> Result<Self> {
        let client = Client::try_from(config)
            .context("Failed to create Kubernetes client from config")?;

        Ok(Self { client })
    }

    /// Get the underlying kube client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get node API
    pub fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    /// Get all pods API
    pub fn pods_all(&self) -> Api<Pod> {
        Api::all(self.client.clone())
    }

    /// List all nodes in the cluster
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self
            .nodes()
            .list(&ListParams::default())
            .await
            .context("Failed to list nodes")?;

        Ok(nodes.items)
    }

    /// List pods across all namespaces
    pub async fn list_pods(&self) -> Result<Vec<Pod>> {
        let pods = self
            .pods_all()
            .list(&ListParams::default())
            .await
            .context("Failed to list pods")?;

        Ok(pods.items)
    }

    /// Fetch plain text from a node's kubelet through the API server proxy.
    ///
    /// `subpath` is appended to the node proxy root, so `metrics/cadvisor`
    /// fetches `/api/v1/nodes/{name}/proxy/metrics/cadvisor`.
    pub async fn node_proxy_text(&self, node: &str, subpath: &str) -> Result<String> {
        let path = format!("/api/v1/nodes/{}/proxy/{}", node, subpath);
        let request = http::Request::builder()
            .method("GET")
            .uri(&path)
            .body(Vec::new())
            .context("Failed to build node proxy request")?;

        self.client
            .request_text(request)
            .await
            .with_context(|| format!("Failed to fetch {} from node {}", subpath, node))
    }

    /// Check if the API server is reachable
    pub async fn health_check(&self) -> Result<()> {
        let _ = self
            .nodes()
            .list(&ListParams::default().limit(1))
            .await
            .context("Failed to list nodes")?;
        Ok(())
    }
}
