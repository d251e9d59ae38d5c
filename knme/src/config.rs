//! Configuration module for KNME
//!
//! Handles loading and validating configuration from YAML files.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use knme_core::collector::ScrapeTarget;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interval between collection cycles
    #[serde(with = "humantime_serde", default = "default_scrape_interval")]
    pub scrape_interval: Duration,

    /// Timeout for fetching one node's metrics through the proxy
    #[serde(with = "humantime_serde", default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,

    /// Address the exporter HTTP server binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Which per-node endpoint to scrape (kubelet or cadvisor)
    #[serde(default)]
    pub target: ScrapeTarget,

    /// Pod phases excluded from the active pod count
    #[serde(default = "default_exclude_phases")]
    pub exclude_phases: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrape_interval: default_scrape_interval(),
            fetch_timeout: default_fetch_timeout(),
            listen_address: default_listen_address(),
            target: ScrapeTarget::default(),
            exclude_phases: default_exclude_phases(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// The listen address parsed for binding
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen_address.parse().with_context(|| {
            format!(
                "listen_address is not a valid socket address: {}",
                self.listen_address
            )
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.scrape_interval.is_zero() {
            anyhow::bail!("scrape_interval must be > 0");
        }
        if self.fetch_timeout.is_zero() {
            anyhow::bail!("fetch_timeout must be > 0");
        }
        let _ = self.listen_addr()?;
        Ok(())
    }
}

// Default value functions
fn default_scrape_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_listen_address() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_exclude_phases() -> Vec<String> {
    vec!["Succeeded".to_string(), "Failed".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scrape_interval, Duration::from_secs(30));
        assert_eq!(config.listen_address, "0.0.0.0:9100");
        assert_eq!(config.target, ScrapeTarget::Cadvisor);
        assert_eq!(config.exclude_phases, vec!["Succeeded", "Failed"]);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
scrape_interval: 1m
fetch_timeout: 5s
listen_address: "127.0.0.1:9200"
target: kubelet
exclude_phases:
  - Succeeded
  - Failed
  - Unknown
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.scrape_interval, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.listen_address, "127.0.0.1:9200");
        assert_eq!(config.target, ScrapeTarget::Kubelet);
        assert_eq!(config.exclude_phases.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml("scrape_interval: 10s\n").unwrap();
        assert_eq!(config.scrape_interval, Duration::from_secs(10));
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.target, ScrapeTarget::Cadvisor);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = Config {
            scrape_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_listen_address() {
        let config = Config {
            listen_address: "not-an-address".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
