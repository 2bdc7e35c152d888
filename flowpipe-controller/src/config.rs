//! Runtime configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The controller's logging config, which uses Rust's `env_logger` directives.
    #[serde(default)]
    pub rust_log: String,
    /// The port serving the health & metrics HTTP endpoints.
    #[serde(default = "Config::default_http_port")]
    pub http_port: u16,

    /// Comma-separated etcd endpoints holding the desired state.
    #[serde(default = "Config::default_etcd_endpoints")]
    pub etcd_endpoints: String,
    /// The Kubernetes namespace runtime workloads are materialized into.
    #[serde(default = "Config::default_namespace")]
    pub runtime_namespace: String,
    /// The number of reconciliation workers, clamped to at least 1.
    #[serde(default = "Config::default_workers")]
    pub workers: usize,
    /// The name of the pod on which this instance is running; used as the
    /// leader election identity.
    #[serde(default)]
    pub pod_name: String,

    /// Whether leader election gates the reconciler.
    #[serde(default)]
    pub leader_election_enabled: bool,
    /// The duration in seconds for which a lease is considered held.
    #[serde(default = "Config::default_lease_duration")]
    pub lease_duration_seconds: u32,
    /// The duration in seconds within which the holder must renew the lease.
    #[serde(default = "Config::default_lease_renew")]
    pub lease_renew_seconds: u32,
    /// The delay in seconds between acquisition attempts while not holding
    /// the lease.
    #[serde(default = "Config::default_lease_retry")]
    pub lease_retry_seconds: u32,

    /// Whether runtime workloads are started with observability enabled.
    #[serde(default)]
    pub observability_enabled: bool,
    /// The OTLP collector endpoint projected into runtime workloads.
    #[serde(default)]
    pub otel_endpoint: String,
}

impl Config {
    /// Create a new config instance from the runtime environment.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        let mut config: Config = envy::from_env().context("error building config from env")?;
        if config.workers == 0 {
            config.workers = 1;
        }
        Ok(config)
    }

    /// The configured etcd endpoints as a list.
    pub fn endpoints(&self) -> Vec<String> {
        self.etcd_endpoints
            .split(',')
            .map(|endpoint| endpoint.trim().to_string())
            .filter(|endpoint| !endpoint.is_empty())
            .collect()
    }

    fn default_http_port() -> u16 {
        7002
    }

    fn default_etcd_endpoints() -> String {
        "http://127.0.0.1:2379".into()
    }

    fn default_namespace() -> String {
        "default".into()
    }

    fn default_workers() -> usize {
        2
    }

    fn default_lease_duration() -> u32 {
        15
    }

    fn default_lease_renew() -> u32 {
        10
    }

    fn default_lease_retry() -> u32 {
        2
    }
}
