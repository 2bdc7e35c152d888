use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::StreamExt;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, SignalStream};
use tokio_stream::StreamMap;

use flowpipe_core::kv::EtcdBackend;
use flowpipe_core::store::FlowStore;

use crate::config::Config;
use crate::controller;
use crate::k8s::runtime::FlowRuntime;
use crate::server;

/// The application object of the controller process.
pub struct App {
    /// The application's runtime config.
    _config: Arc<Config>,

    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,

    /// The join handle of the health/metrics HTTP server.
    http: JoinHandle<()>,
    /// The join handle of the reconciliation engine.
    controller: JoinHandle<Result<()>>,
}

impl App {
    /// Create a new instance.
    pub async fn new(
        config: Arc<Config>,
        metrics_handle: PrometheusHandle,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Result<Self> {
        // Desired-state store.
        let kv = EtcdBackend::connect(config.endpoints())
            .await
            .context("error connecting to etcd")?;
        let store = FlowStore::new(Arc::new(kv));

        // Cluster client & materializer.
        let client = kube::Client::try_default()
            .await
            .context("error initializing K8s client")?;
        let runtime = Arc::new(FlowRuntime::new(
            client.clone(),
            config.runtime_namespace.clone(),
            config.observability_enabled,
            config.otel_endpoint.clone(),
        ));

        let http = server::spawn(config.http_port, metrics_handle, shutdown_tx.clone());
        let controller = tokio::spawn(controller::run(
            config.clone(),
            client,
            store,
            runtime,
            shutdown_tx.clone(),
        ));

        Ok(Self {
            _config: config,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
            http,
            controller,
        })
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<()> {
        let mut signals = StreamMap::new();
        signals.insert(
            "sigterm",
            SignalStream::new(signal(SignalKind::terminate()).context("error building signal stream")?),
        );
        signals.insert(
            "sigint",
            SignalStream::new(signal(SignalKind::interrupt()).context("error building signal stream")?),
        );

        loop {
            tokio::select! {
                Some((_, sig)) = signals.next() => {
                    tracing::debug!(signal = ?sig, "signal received, beginning graceful shutdown");
                    let _res = self.shutdown_tx.send(());
                    break;
                }
                _ = self.shutdown_rx.next() => break,
            }
        }

        tracing::debug!("Flowpipe controller is shutting down");
        if let Err(err) = self.http.await {
            tracing::error!(error = ?err, "error joining health/metrics server task");
        }
        if let Err(err) = self
            .controller
            .await
            .context("error joining controller handle")
            .and_then(|res| res)
        {
            tracing::error!(error = ?err, "error shutting down controller");
        }

        tracing::debug!("Flowpipe controller shutdown complete");
        Ok(())
    }
}
