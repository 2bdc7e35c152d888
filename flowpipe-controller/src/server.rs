//! The health & metrics HTTP server.

use std::net::SocketAddr;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{AddExtensionLayer, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Spawn the health & metrics server on the given port.
pub fn spawn(
    port: u16,
    metrics_handle: PrometheusHandle,
    shutdown: broadcast::Sender<()>,
) -> JoinHandle<()> {
    let app = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/metrics", get(prom_metrics))
        .layer(AddExtensionLayer::new(metrics_handle));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let mut shutdown_rx = shutdown.subscribe();
    let server = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async move {
            let _res = shutdown_rx.recv().await;
        });

    tokio::spawn(async move {
        if let Err(err) = server.await {
            tracing::error!(error = ?err, "error from health/metrics server, shutting down");
            let _res = shutdown.send(());
        }
    })
}

/// Render the process metrics in Prometheus exposition format.
async fn prom_metrics(Extension(handle): Extension<PrometheusHandle>) -> String {
    handle.render()
}
