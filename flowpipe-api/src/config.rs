//! Runtime configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The server's logging config, which uses Rust's `env_logger` directives.
    #[serde(default)]
    pub rust_log: String,
    /// The port serving the request/response RPC surface.
    #[serde(default = "Config::default_grpc_port")]
    pub grpc_port: u16,
    /// The port serving the health & metrics HTTP endpoints.
    #[serde(default = "Config::default_http_port")]
    pub http_port: u16,

    /// Comma-separated etcd endpoints holding the desired state.
    #[serde(default = "Config::default_etcd_endpoints")]
    pub etcd_endpoints: String,

    /// Path to the PEM certificate presented by the RPC listener.
    #[serde(default)]
    pub grpc_tls_cert_file: Option<String>,
    /// Path to the PEM private key of the RPC listener certificate.
    #[serde(default)]
    pub grpc_tls_key_file: Option<String>,
}

impl Config {
    /// Create a new config instance from the runtime environment.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        envy::from_env().context("error building config from env")
    }

    /// The configured etcd endpoints as a list.
    pub fn endpoints(&self) -> Vec<String> {
        self.etcd_endpoints
            .split(',')
            .map(|endpoint| endpoint.trim().to_string())
            .filter(|endpoint| !endpoint.is_empty())
            .collect()
    }

    /// The TLS material of the RPC listener, when configured.
    ///
    /// Both the certificate and key must be given together.
    pub fn grpc_tls(&self) -> Result<Option<(&str, &str)>> {
        match (self.grpc_tls_cert_file.as_deref(), self.grpc_tls_key_file.as_deref()) {
            (Some(cert), Some(key)) => Ok(Some((cert, key))),
            (None, None) => Ok(None),
            _ => anyhow::bail!("GRPC_TLS_CERT_FILE and GRPC_TLS_KEY_FILE must be set together"),
        }
    }

    fn default_grpc_port() -> u16 {
        7000
    }

    fn default_http_port() -> u16 {
        7001
    }

    fn default_etcd_endpoints() -> String {
        "http://127.0.0.1:2379".into()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_deserializes_from_env_pairs() -> Result<()> {
        let config: Config = envy::from_iter(vec![
            ("RUST_LOG".to_string(), "info".to_string()),
            ("GRPC_PORT".to_string(), "9000".to_string()),
            ("HTTP_PORT".to_string(), "9001".to_string()),
            ("ETCD_ENDPOINTS".to_string(), "http://etcd:2379".to_string()),
        ])?;
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.grpc_port, 9000);
        assert_eq!(config.http_port, 9001);
        assert_eq!(config.endpoints(), vec!["http://etcd:2379".to_string()]);
        Ok(())
    }

    #[test]
    fn config_defaults_from_sparse_env() -> Result<()> {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new())?;
        assert_eq!(config.grpc_port, 7000);
        assert_eq!(config.http_port, 7001);
        assert_eq!(config.endpoints(), vec!["http://127.0.0.1:2379".to_string()]);
        assert_eq!(config.grpc_tls()?, None);
        Ok(())
    }

    #[test]
    fn grpc_tls_requires_both_halves() -> Result<()> {
        let config: Config = envy::from_iter(vec![(
            "GRPC_TLS_CERT_FILE".to_string(),
            "/tls/cert.pem".to_string(),
        )])?;
        assert!(config.grpc_tls().is_err());

        let config: Config = envy::from_iter(vec![
            ("GRPC_TLS_CERT_FILE".to_string(), "/tls/cert.pem".to_string()),
            ("GRPC_TLS_KEY_FILE".to_string(), "/tls/key.pem".to_string()),
        ])?;
        assert_eq!(config.grpc_tls()?, Some(("/tls/cert.pem", "/tls/key.pem")));
        Ok(())
    }
}
