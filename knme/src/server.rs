//! Exporter HTTP endpoint
//!
//! Serves the collector's registry over plain HTTP: `GET /metrics` in
//! the Prometheus text format and `GET /healthz` for probes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use knme_core::metrics::ExporterMetrics;

/// Run the metrics HTTP server until the process exits.
pub async fn serve(addr: SocketAddr, metrics: Arc<ExporterMetrics>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", addr))?;
    info!(address = %addr, "Metrics server listening");

    loop {
        let (mut socket, peer) = listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buf = [0; 1024];
            let n = match socket.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "Failed to read request");
                    return;
                }
            };

            let request = String::from_utf8_lossy(&buf[..n]);
            let response = respond(&request, &metrics);
            let _ = socket.write_all(response.as_bytes()).await;
        });
    }
}

/// Build the HTTP response for one request.
fn respond(request: &str, metrics: &ExporterMetrics) -> String {
    match request_path(request) {
        Some("/metrics") => match metrics.encode() {
            Ok(body) => http_response(
                "200 OK",
                "text/plain; version=0.0.4; charset=utf-8",
                &body,
            ),
            Err(e) => {
                error!(error = %e, "Failed to encode metrics");
                http_response(
                    "500 Internal Server Error",
                    "text/plain; charset=utf-8",
                    "encoding failure\n",
                )
            }
        },
        Some("/healthz") => http_response("200 OK", "text/plain; charset=utf-8", "ok\n"),
        _ => http_response("404 Not Found", "text/plain; charset=utf-8", "not found\n"),
    }
}

/// Extract the path from the request line. Only GET requests route.
fn request_path(request: &str) -> Option<&str> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(path)) => Some(path),
        _ => None,
    }
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use knme_core::exposition::UsageTotals;

    fn metrics_with_node() -> ExporterMetrics {
        let metrics = ExporterMetrics::new().unwrap();
        metrics.publish_node("node-a", &UsageTotals::default(), 2);
        metrics
    }

    #[test]
    fn test_metrics_route() {
        let metrics = metrics_with_node();
        let response = respond("GET /metrics HTTP/1.1\r\nHost: localhost\r\n\r\n", &metrics);

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("version=0.0.4"));
        assert!(response.contains("k8s_node_active_pods{node=\"node-a\"} 2"));
    }

    #[test]
    fn test_healthz_route() {
        let metrics = metrics_with_node();
        let response = respond("GET /healthz HTTP/1.1\r\n\r\n", &metrics);

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("ok\n"));
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let metrics = metrics_with_node();
        let response = respond("GET /favicon.ico HTTP/1.1\r\n\r\n", &metrics);

        assert!(response.starts_with("HTTP/1.1 404 Not Found"));
    }

    #[test]
    fn test_non_get_is_not_found() {
        let metrics = metrics_with_node();
        let response = respond("POST /metrics HTTP/1.1\r\n\r\n", &metrics);

        assert!(response.starts_with("HTTP/1.1 404 Not Found"));
    }

    #[test]
    fn test_request_path() {
        assert_eq!(
            request_path("GET /metrics HTTP/1.1\r\n\r\n"),
            Some("/metrics")
        );
        assert_eq!(request_path("PUT /metrics HTTP/1.1\r\n\r\n"), None);
        assert_eq!(request_path(""), None);
    }
}
