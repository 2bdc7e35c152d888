//! The reconciliation engine.
//!
//! The controller seeds its work queue from the store, feeds it from the
//! store's watch stream, and runs a pool of workers which drive the cluster
//! toward each flow's active spec. Reconciliation is idempotent and every
//! failure is retried through the queue's back-off; workers only exit when
//! the queue closes.

#[cfg(test)]
mod mod_test;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::prelude::*;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

use flowpipe_core::kv::KvBackend;
use flowpipe_core::models::proto::FlowStatus;
use flowpipe_core::store::{translate_event, FlowStore};

use crate::config::Config;
use crate::k8s::coordination::{LeaderElectionConfig, LeaderElector, LeaderState, LEASE_NAME};
use crate::k8s::runtime::RuntimeBackend;
use crate::queue::WorkQueue;

/// The delay before re-opening a failed watch stream.
const WATCH_RECONNECT_DELAY: Duration = Duration::from_secs(5);

const METRIC_QUEUE_LAG: &str = "flowpipe_controller_workqueue_lag_seconds";
const METRIC_RECONCILE_DURATION: &str = "flowpipe_controller_reconcile_duration_seconds";
const METRIC_RECONCILES_OK: &str = "flowpipe_controller_reconciles_succeeded";
const METRIC_RECONCILES_FAILED: &str = "flowpipe_controller_reconciles_failed";

/// The core reconciliation engine.
pub struct Controller<B, R> {
    store: FlowStore<B>,
    runtime: Arc<R>,
    queue: WorkQueue,
    workers: usize,
    shutdown_tx: broadcast::Sender<()>,
}

impl<B: KvBackend, R: RuntimeBackend> Controller<B, R> {
    /// Create a new instance.
    pub fn new(
        store: FlowStore<B>,
        runtime: Arc<R>,
        workers: usize,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        metrics::register_histogram!(
            METRIC_QUEUE_LAG,
            metrics::Unit::Seconds,
            "time keys spend waiting in the work queue before delivery"
        );
        metrics::register_histogram!(
            METRIC_RECONCILE_DURATION,
            metrics::Unit::Seconds,
            "wall-clock duration of individual reconcile calls"
        );
        metrics::register_counter!(
            METRIC_RECONCILES_OK,
            metrics::Unit::Count,
            "reconcile calls which completed successfully"
        );
        metrics::register_counter!(
            METRIC_RECONCILES_FAILED,
            metrics::Unit::Count,
            "reconcile calls which failed and were requeued"
        );
        Self {
            store,
            runtime,
            queue: WorkQueue::new(),
            workers: workers.max(1),
            shutdown_tx,
        }
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown: seed, watch, work, drain.
    pub async fn run(self) -> Result<()> {
        // Seed the queue with every flow currently in the store.
        let names = self
            .store
            .list_flow_names()
            .await
            .context("error listing flows for initial sync")?;
        for name in &names {
            self.queue.add(name);
        }
        tracing::info!(count = names.len(), "seeded work queue from store");

        let watch_handle = tokio::spawn(watch_flows(
            self.store.clone(),
            self.queue.clone(),
            self.shutdown_tx.subscribe(),
        ));

        let mut worker_handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            worker_handles.push(tokio::spawn(worker(
                id,
                self.store.clone(),
                self.runtime.clone(),
                self.queue.clone(),
            )));
        }

        // Block until shutdown, then close the queue and join everything.
        let mut shutdown = BroadcastStream::new(self.shutdown_tx.subscribe());
        let _ = shutdown.next().await;
        tracing::debug!("controller shutting down");

        self.queue.shutdown();
        for handle in worker_handles {
            if let Err(err) = handle.await {
                tracing::error!(error = ?err, "error joining reconciliation worker");
            }
        }
        if let Err(err) = watch_handle.await {
            tracing::error!(error = ?err, "error joining watch task");
        }

        tracing::debug!("controller stopped");
        Ok(())
    }
}

/// Feed the work queue from the store's watch stream.
///
/// A broken stream is re-opened after a short delay, and every (re)connect
/// re-seeds the queue from a full listing: events emitted while the stream
/// was down are gone for good, the listing is not.
async fn watch_flows<B: KvBackend>(
    store: FlowStore<B>,
    queue: WorkQueue,
    shutdown: broadcast::Receiver<()>,
) {
    let mut shutdown = BroadcastStream::new(shutdown);
    tracing::info!("flow watch task started");
    loop {
        let mut watch = match store.watch().await {
            Ok(watch) => watch,
            Err(err) => {
                tracing::error!(error = ?err, "error opening store watch stream");
                tokio::select! {
                    _ = tokio::time::sleep(WATCH_RECONNECT_DELAY) => continue,
                    _ = shutdown.next() => return,
                }
            }
        };

        match store.list_flow_names().await {
            Ok(names) => {
                for name in &names {
                    queue.add(name);
                }
            }
            Err(err) => {
                tracing::warn!(error = ?err, "error re-seeding queue after watch connect");
            }
        }

        loop {
            tokio::select! {
                maybe_event = watch.next() => match maybe_event {
                    Some(event) => {
                        if let Some(flow_event) = translate_event(&store, &event).await {
                            tracing::debug!(flow = %flow_event.name, kind = ?flow_event.kind, "flow watch event");
                            queue.add(&flow_event.name);
                        }
                    }
                    None => {
                        tracing::warn!("store watch stream closed, reconnecting");
                        tokio::select! {
                            _ = tokio::time::sleep(WATCH_RECONNECT_DELAY) => break,
                            _ = shutdown.next() => return,
                        }
                    }
                },
                _ = shutdown.next() => return,
            }
        }
    }
}

/// A reconciliation worker loop.
///
/// Errors release the key back to the queue with back-off; only queue
/// closure ends the loop.
async fn worker<B: KvBackend, R: RuntimeBackend>(
    id: usize,
    store: FlowStore<B>,
    runtime: Arc<R>,
    queue: WorkQueue,
) {
    tracing::debug!(worker = id, "reconciliation worker started");
    while let Some((name, lag)) = queue.get().await {
        metrics::histogram!(METRIC_QUEUE_LAG, lag.as_secs_f64());
        let started = Instant::now();
        match reconcile(&store, runtime.as_ref(), &name).await {
            Ok(()) => {
                metrics::increment_counter!(METRIC_RECONCILES_OK);
                queue.forget(&name);
            }
            Err(err) => {
                tracing::error!(error = ?err, flow = %name, "reconcile failed");
                metrics::increment_counter!(METRIC_RECONCILES_FAILED);
                queue.retry(&name);
            }
        }
        metrics::histogram!(METRIC_RECONCILE_DURATION, started.elapsed().as_secs_f64());
    }
    tracing::debug!(worker = id, "reconciliation worker stopped");
}

/// Drive the cluster toward the named flow's active spec.
#[tracing::instrument(level = "debug", skip(store, runtime))]
async fn reconcile<B: KvBackend, R: RuntimeBackend>(
    store: &FlowStore<B>,
    runtime: &R,
    name: &str,
) -> Result<()> {
    let active = store.get_active_flow(name).await?;
    let (spec, version) = match active {
        Some(found) => found,
        None => {
            // Deleted, or transiently incomplete: converge on nothing.
            tracing::debug!(flow = %name, "flow absent from store, deleting runtime objects");
            return runtime.delete_all(name).await;
        }
    };

    let workload = runtime.ensure(&spec).await?;
    store
        .update_status(
            name,
            FlowStatus::deploying(version, workload, "runtime objects applied"),
        )
        .await?;
    tracing::debug!(flow = %name, version, "flow reconciled");
    Ok(())
}

/// Run the reconciler, optionally gated behind leader election.
///
/// With election enabled, a reconciler session starts on `Leading` and is
/// cancelled the moment the published state leaves it; losing and regaining
/// the lease starts a fresh session which re-seeds from the store.
pub async fn run<B: KvBackend, R: RuntimeBackend>(
    config: Arc<Config>,
    client: kube::Client,
    store: FlowStore<B>,
    runtime: Arc<R>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<()> {
    if !config.leader_election_enabled {
        return Controller::new(store, runtime, config.workers, shutdown_tx)
            .run()
            .await;
    }

    let elect_config = LeaderElectionConfig::new(
        &config.runtime_namespace,
        LEASE_NAME,
        config.pod_name.clone(),
        chrono::Duration::seconds(config.lease_duration_seconds as i64),
        chrono::Duration::seconds(config.lease_renew_seconds as i64),
        chrono::Duration::seconds(config.lease_retry_seconds as i64),
    )
    .context("invalid leader election config")?;
    let (elector, state_rx) = LeaderElector::new(elect_config, client, shutdown_tx.subscribe());
    let elector_handle = elector.spawn();

    let mut states = WatchStream::new(state_rx);
    let mut shutdown = BroadcastStream::new(shutdown_tx.subscribe());
    let mut session: Option<(broadcast::Sender<()>, JoinHandle<Result<()>>)> = None;

    loop {
        tokio::select! {
            maybe_state = states.next() => {
                let state = match maybe_state {
                    Some(state) => state,
                    None => break,
                };
                match state {
                    LeaderState::Leading => {
                        if session.is_none() {
                            tracing::info!("lease acquired, starting reconciler");
                            let (session_tx, _) = broadcast::channel(1);
                            let controller = Controller::new(
                                store.clone(),
                                runtime.clone(),
                                config.workers,
                                session_tx.clone(),
                            );
                            session = Some((session_tx, controller.spawn()));
                        }
                    }
                    state => {
                        if let Some((session_tx, handle)) = session.take() {
                            tracing::info!(state = ?state, "leadership lost, stopping reconciler");
                            let _ = session_tx.send(());
                            join_session(handle).await;
                        }
                    }
                }
            }
            _ = shutdown.next() => break,
        }
    }

    if let Some((session_tx, handle)) = session.take() {
        let _ = session_tx.send(());
        join_session(handle).await;
    }
    if let Err(err) = elector_handle.await {
        tracing::error!(error = ?err, "error joining leader elector task");
    }
    Ok(())
}

async fn join_session(handle: JoinHandle<Result<()>>) {
    match handle.await {
        Ok(Ok(())) => (),
        Ok(Err(err)) => tracing::error!(error = ?err, "reconciler session ended with error"),
        Err(err) => tracing::error!(error = ?err, "error joining reconciler session"),
    }
}
