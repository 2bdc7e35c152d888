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
use flowpipe_core::store::{FlowStore, SchemaRegistry};

use crate::config::Config;
use crate::server::AppServer;

/// The application object of the API process.
pub struct App {
    /// The application's runtime config.
    _config: Arc<Config>,

    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,

    /// The join handle of the RPC & HTTP servers.
    server: JoinHandle<()>,
}

impl App {
    /// Create a new instance.
    pub async fn new(
        config: Arc<Config>,
        metrics_handle: PrometheusHandle,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Result<Self> {
        // Desired-state stores over a shared backend connection.
        let kv = Arc::new(
            EtcdBackend::connect(config.endpoints())
                .await
                .context("error connecting to etcd")?,
        );
        let store = FlowStore::new(kv.clone());
        let registry = SchemaRegistry::new(kv);

        let server = AppServer::new(config.clone(), shutdown_tx.clone())
            .spawn(store, registry, metrics_handle)
            .context("error setting up API servers")?;

        Ok(Self {
            _config: config,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
            server,
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

        tracing::debug!("Flowpipe API is shutting down");
        if let Err(err) = self.server.await {
            tracing::error!(error = ?err, "error joining server task");
        }

        tracing::debug!("Flowpipe API shutdown complete");
        Ok(())
    }
}
