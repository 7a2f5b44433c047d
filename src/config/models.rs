// src/config/models.rs
use anyhow::{bail, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional attempts after a transport failure.
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Maximum probes in flight; 0 disables the limit.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub id: String,
    pub name: String,
    pub url: Url,
    #[serde(default)]
    pub group: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub assertions: Option<Assertions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertions {
    #[serde(default)]
    pub status: Option<Vec<u16>>,
    #[serde(default)]
    pub contains_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Relative paths resolve against the data directory.
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("uptime-runner/{}", env!("CARGO_PKG_VERSION"))
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_concurrency() -> usize {
    10
}

fn default_method() -> String {
    "GET".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrency: default_concurrency(),
        }
    }
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl ServiceSpec {
    pub fn http_method(&self) -> Result<Method> {
        Ok(Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())?)
    }
}

impl Config {
    /// Checks the runner relies on: ids become file names, methods must parse.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.timeout_ms == 0 {
            bail!("monitor.timeoutMs must be greater than zero");
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if !is_safe_id(&service.id) {
                bail!(
                    "service id {:?} must be non-empty and only contain [A-Za-z0-9._-]",
                    service.id
                );
            }
            if !seen.insert(service.id.as_str()) {
                bail!("duplicate service id {:?}", service.id);
            }
            if service.http_method().is_err() {
                bail!(
                    "service {} has an invalid HTTP method {:?}",
                    service.id,
                    service.method
                );
            }
        }

        Ok(())
    }
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
