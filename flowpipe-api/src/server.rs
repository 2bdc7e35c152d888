//! The API server: the request/response RPC surface plus health & metrics.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{AddExtensionLayer, Router};
use futures::future::FusedFuture;
use futures::prelude::*;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tonic::transport::{Identity, Server as TonicServer, ServerTlsConfig};

use flowpipe_core::kv::KvBackend;
use flowpipe_core::store::{FlowStore, SchemaRegistry};

use crate::config::Config;
use crate::grpc::{FlowServiceServer, SchemaRegistryServiceServer};
use crate::handlers::{FlowHandlers, SchemaHandlers};

/// Application server.
pub struct AppServer {
    /// The application's runtime config.
    config: Arc<Config>,

    /// A channel used for triggering graceful shutdown.
    shutdown: broadcast::Sender<()>,
}

impl AppServer {
    /// Create a new instance.
    pub fn new(config: Arc<Config>, shutdown: broadcast::Sender<()>) -> Self {
        Self { config, shutdown }
    }

    /// Spawn the RPC & HTTP servers.
    ///
    /// This call does not block; the returned handle joins once both servers
    /// have shut down.
    pub fn spawn<B: KvBackend>(
        self,
        store: FlowStore<B>,
        registry: SchemaRegistry<B>,
        metrics_handle: PrometheusHandle,
    ) -> Result<JoinHandle<()>> {
        // The HTTP server for healthchecks & metrics.
        let shutdown = self.shutdown.clone();
        let mut http_shutdown_rx = self.shutdown.subscribe();
        let app = Router::new()
            .route("/health", get(|| async { StatusCode::OK }))
            .route("/metrics", get(prom_metrics))
            .layer(AddExtensionLayer::new(metrics_handle));
        let http_addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let http_server = axum::Server::bind(&http_addr)
            .serve(app.into_make_service())
            .with_graceful_shutdown(async move {
                let _res = http_shutdown_rx.recv().await;
            });

        // The gRPC server carrying the flow & schema services.
        let grpc_addr = SocketAddr::from(([0, 0, 0, 0], self.config.grpc_port));
        let mut grpc_shutdown_rx = self.shutdown.subscribe();
        let mut grpc_builder = TonicServer::builder();
        if let Some((cert_path, key_path)) = self.config.grpc_tls()? {
            let cert = std::fs::read(cert_path).context("error reading RPC TLS certificate")?;
            let key = std::fs::read(key_path).context("error reading RPC TLS key")?;
            grpc_builder = grpc_builder
                .tls_config(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
                .context("error applying RPC TLS config")?;
        }
        let grpc_server = grpc_builder
            .add_service(FlowServiceServer::new(FlowHandlers::new(store)))
            .add_service(SchemaRegistryServiceServer::new(SchemaHandlers::new(registry)))
            .serve_with_shutdown(grpc_addr, async move {
                let _res = grpc_shutdown_rx.recv().await;
            });

        // Await the shutdown of both spawned servers.
        Ok(tokio::spawn(async move {
            let grpc_server_fused = grpc_server.fuse();
            let http_server_fused = http_server.fuse();
            tokio::pin!(grpc_server_fused, http_server_fused);
            loop {
                tokio::select! {
                    Err(err) = &mut grpc_server_fused, if !grpc_server_fused.is_terminated() => {
                        tracing::error!(error = ?err, "error from gRPC server, shutting down");
                        let _res = shutdown.send(());
                    },
                    Err(err) = &mut http_server_fused, if !http_server_fused.is_terminated() => {
                        tracing::error!(error = ?err, "error from http server, shutting down");
                        let _res = shutdown.send(());
                    },
                    else => break,
                }
            }
        }))
    }
}

/// Render the process metrics in Prometheus exposition format.
async fn prom_metrics(Extension(handle): Extension<PrometheusHandle>) -> String {
    handle.render()
}
