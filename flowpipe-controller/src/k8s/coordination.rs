//! Lease-based leader coordination over the `coordination.k8s.io/v1` API.
//!
//! The elector acquires and renews a Lease object and publishes its view of
//! leadership on a watch channel. The `coordination.k8s.io/v1` API does not
//! by itself guarantee a single actor: consumers must stop leadership work
//! promptly when the published state leaves `Leading`. On voluntary shutdown
//! the elector releases the lease so a successor does not have to wait out
//! the full lease duration.

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Duration, Utc};
use futures::prelude::*;
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::api::{Api, ListParams, ObjectMeta, Patch, PatchParams};
use kube::client::Client;
use kube::runtime::watcher::{watcher, Error as WatcherError, Event};
use maplit::btreemap;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_stream::wrappers::BroadcastStream;

/// Slack factor between the renew deadline and the retry period.
const JITTER_FACTOR: f64 = 1.2;
/// The name of the lease object coordinated over.
pub const LEASE_NAME: &str = "flowpipe-controller";

const METRIC_IS_LEADER: &str = "flowpipe_controller_is_leader";
const METRIC_LEADERSHIP_CHANGES: &str = "flowpipe_controller_leadership_changes";

/// The states an elector may observe.
#[derive(Clone, Debug, PartialEq)]
pub enum LeaderState {
    /// This instance holds the lease.
    Leading,
    /// Another instance, identified by the encapsulated string, holds the lease.
    Following(String),
    /// The lease state is unknown, or the elector is starting or stopping.
    Standby,
}

/// Configuration for leader election.
pub struct LeaderElectionConfig {
    /// The name of the lease object.
    name: String,
    /// The namespace of the lease object.
    namespace: String,
    /// The identity recorded as the lease holder.
    identity: String,
    /// How long non-holders wait after the last observed change before
    /// force-acquiring the lease.
    lease_duration: Duration,
    /// How often the holder re-asserts the lease.
    renew_deadline: Duration,
    /// The delay between acquisition attempts while not holding the lease.
    #[allow(dead_code)]
    retry_period: Duration,
}

impl LeaderElectionConfig {
    /// Create a new config, validating the relations between the timings.
    pub fn new(
        namespace: impl AsRef<str>,
        name: impl AsRef<str>,
        identity: String,
        lease_duration: Duration,
        renew_deadline: Duration,
        retry_period: Duration,
    ) -> Result<Self> {
        ensure!(
            lease_duration > renew_deadline,
            "lease_duration must be greater than renew_deadline"
        );
        ensure!(
            renew_deadline
                > Duration::seconds((JITTER_FACTOR * retry_period.num_seconds() as f64) as i64),
            "renew_deadline must be greater than retry_period*{}",
            JITTER_FACTOR,
        );
        ensure!(lease_duration.num_seconds() >= 1, "lease_duration must be at least 1 second");
        ensure!(renew_deadline.num_seconds() >= 1, "renew_deadline must be at least 1 second");
        ensure!(retry_period.num_seconds() >= 1, "retry_period must be at least 1 second");
        ensure!(!identity.is_empty(), "leader election identity must not be empty");
        Ok(Self {
            name: name.as_ref().to_string(),
            namespace: namespace.as_ref().to_string(),
            identity,
            lease_duration,
            renew_deadline,
            retry_period,
        })
    }
}

/// A task which acquires and maintains a Lease to establish leadership.
pub struct LeaderElector {
    api: Api<Lease>,
    /// The field manager name used for Server-Side Apply.
    manager: String,
    config: LeaderElectionConfig,
    state_tx: watch::Sender<LeaderState>,
    state: LeaderState,
    shutdown: BroadcastStream<()>,

    /// The last lease observed from the API.
    last_observed_lease: Lease,
    /// When a change to the lease was last observed.
    last_observed_change: DateTime<Utc>,
}

impl LeaderElector {
    /// Create a new instance along with the channel publishing its state.
    pub fn new(
        config: LeaderElectionConfig,
        client: Client,
        shutdown: broadcast::Receiver<()>,
    ) -> (Self, watch::Receiver<LeaderState>) {
        metrics::register_gauge!(
            METRIC_IS_LEADER,
            metrics::Unit::Count,
            "1.0 while this instance holds the coordination lease"
        );
        metrics::register_gauge!(
            METRIC_LEADERSHIP_CHANGES,
            metrics::Unit::Count,
            "the number of leadership transitions recorded on the lease"
        );
        let (state_tx, state_rx) = watch::channel(LeaderState::Standby);
        let lease = Self::initial_lease(&config);
        (
            Self {
                api: Api::namespaced(client, &config.namespace),
                manager: config.identity.clone(),
                config,
                state_tx,
                state: LeaderState::Standby,
                shutdown: BroadcastStream::new(shutdown),
                last_observed_lease: lease,
                last_observed_change: Utc::now(),
            },
            state_rx,
        )
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::info!("leader elector task started");

        if let Err(err) = self.try_acquire_or_renew().await {
            tracing::error!(error = ?err, "error attempting to acquire/renew lease");
        }

        let lease_watcher = watcher(
            self.api.clone(),
            ListParams {
                field_selector: Some(format!("metadata.name={}", self.config.name)),
                ..Default::default()
            },
        );
        tokio::pin!(lease_watcher);

        loop {
            let delay = tokio::time::sleep(self.next_acquire_renew_delay());
            tokio::pin!(delay);
            tokio::select! {
                Some(change_res) = lease_watcher.next() => self.handle_lease_watcher_change(change_res),
                _ = &mut delay => {
                    if let Err(err) = self.try_acquire_or_renew().await {
                        tracing::error!(error = ?err, "error during call to try_acquire_or_renew");
                        if !matches!(&self.state, LeaderState::Standby) {
                            self.set_state(LeaderState::Standby);
                        }
                        self.last_observed_change = Utc::now();
                    }
                }
                _ = self.shutdown.next() => break,
            }
        }

        // Voluntary shutdown: hand the lease off instead of letting it expire.
        if let Err(err) = self.release().await {
            tracing::error!(error = ?err, "error releasing leadership lease on shutdown");
        }
        self.set_state(LeaderState::Standby);
        tracing::info!("leader elector task stopped");
    }

    /// Handle a change from the lease watcher.
    fn handle_lease_watcher_change(&mut self, res: Result<Event<Lease>, WatcherError>) {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(error = ?err, "error from lease watcher stream");
                return;
            }
        };
        let lease = match event {
            Event::Applied(lease) => lease,
            _ => return,
        };
        if lease != self.last_observed_lease {
            self.last_observed_change = Utc::now();
            self.update_lease_from_api(lease);
        }
    }

    /// Ensure the target lease exists, updating observation info as needed.
    async fn ensure_lease(&mut self) -> Result<()> {
        let now = Utc::now();
        let get_res = timeout(Self::timeout(), self.api.get(&self.config.name))
            .await
            .context("timeout fetching lease")?
            .context("error fetching lease");
        if let Ok(lease) = get_res {
            if self.last_observed_lease == lease {
                return Ok(());
            }
            self.last_observed_change = now;
            self.update_lease_from_api(lease);
            return Ok(());
        }

        // Attempt to create the lease if it does not already exist.
        let lease = timeout(
            Self::timeout(),
            self.api.create(&Default::default(), &self.last_observed_lease),
        )
        .await
        .context("timeout creating lease")?
        .context("error creating lease")?;
        self.last_observed_change = now;
        self.update_lease_from_api(lease);
        Ok(())
    }

    /// Attempt to acquire or renew the target lease.
    async fn try_acquire_or_renew(&mut self) -> Result<()> {
        self.ensure_lease().await.context("error ensuring lease exists")?;

        // While following a non-expired leader there is nothing to do.
        let now = Utc::now();
        let follower_deadline = self.last_observed_change + self.config.lease_duration;
        let updated_lease = match &self.state {
            LeaderState::Following(other) if follower_deadline > now => {
                tracing::debug!(holder = %other, "lease is held and has not yet expired");
                return Ok(());
            }
            state => {
                let mut lease = self.last_observed_lease.clone();
                let spec = lease.spec.get_or_insert_with(Default::default);
                spec.lease_duration_seconds = Some(self.config.lease_duration.num_seconds() as i32);
                spec.renew_time = Some(MicroTime(now));
                if !matches!(state, LeaderState::Leading) {
                    spec.holder_identity = Some(self.config.identity.clone());
                    spec.acquire_time = Some(MicroTime(now));
                    spec.lease_transitions =
                        Some(spec.lease_transitions.map(|val| val + 1).unwrap_or(0));
                }
                lease.metadata.managed_fields = None;
                lease
            }
        };

        let lease = self.patch_lease(updated_lease).await?;
        self.last_observed_change = now;
        self.update_lease_from_api(lease);
        Ok(())
    }

    /// Release the lease if this instance currently holds it.
    async fn release(&mut self) -> Result<()> {
        if !matches!(self.state, LeaderState::Leading) {
            return Ok(());
        }
        let mut lease = self.last_observed_lease.clone();
        let spec = lease.spec.get_or_insert_with(Default::default);
        spec.holder_identity = Some(String::new());
        spec.renew_time = None;
        spec.acquire_time = None;
        lease.metadata.managed_fields = None;
        self.patch_lease(lease).await?;
        tracing::info!("leadership lease released");
        Ok(())
    }

    /// Patch the lease in K8s using Server-Side Apply.
    async fn patch_lease(&mut self, lease: Lease) -> Result<Lease> {
        let mut params = PatchParams::apply(&self.manager);
        params.force = true; // Still blocked by the server on stale lease info.
        timeout(
            Self::timeout(),
            self.api.patch(&self.config.name, &params, &Patch::Apply(lease)),
        )
        .await
        .context("timeout while updating lease")?
        .context("error updating lease")
    }

    /// Update state from a lease observed via the API, emitting transitions.
    fn update_lease_from_api(&mut self, lease: Lease) {
        self.last_observed_lease = lease;
        let holder = self
            .last_observed_lease
            .spec
            .as_ref()
            .map(|spec| {
                if let Some(transitions) = spec.lease_transitions {
                    metrics::gauge!(METRIC_LEADERSHIP_CHANGES, transitions as f64);
                }
                spec.holder_identity.as_deref().unwrap_or_default()
            })
            .unwrap_or_default();
        let lease_is_held = holder == self.config.identity;
        let next = match &self.state {
            LeaderState::Leading if lease_is_held => None,
            LeaderState::Following(id) if id == holder => None,
            _ if lease_is_held => Some(LeaderState::Leading),
            _ => Some(LeaderState::Following(holder.into())),
        };
        if let Some(state) = next {
            self.set_state(state);
        }
    }

    /// The delay before the next acquire/renew attempt.
    fn next_acquire_renew_delay(&self) -> std::time::Duration {
        let now = Utc::now();
        let addend = match &self.state {
            LeaderState::Leading => self.config.renew_deadline,
            LeaderState::Following(_) => self.config.lease_duration,
            LeaderState::Standby => self.config.retry_period,
        };
        let deadline = self.last_observed_change + addend;
        if deadline > now {
            std::time::Duration::from_secs((deadline - now).num_seconds().max(0) as u64)
        } else {
            std::time::Duration::from_secs(0)
        }
    }

    /// Set the current leader state & publish the update.
    fn set_state(&mut self, state: LeaderState) {
        self.state = state;
        let _ = self.state_tx.send(self.state.clone());
        metrics::gauge!(
            METRIC_IS_LEADER,
            if matches!(self.state, LeaderState::Leading) { 1.0 } else { 0.0 }
        );
    }

    /// The initial lease object used when none exists yet.
    fn initial_lease(config: &LeaderElectionConfig) -> Lease {
        let now = Utc::now();
        Lease {
            metadata: ObjectMeta {
                name: Some(config.name.clone()),
                namespace: Some(config.namespace.clone()),
                labels: Some(btreemap! {
                    "app".into() => "flowpipe".into(),
                    "app.kubernetes.io/name".into() => "flowpipe-controller".into(),
                }),
                ..Default::default()
            },
            spec: Some(LeaseSpec {
                acquire_time: Some(MicroTime(now)),
                holder_identity: Some(config.identity.clone()),
                lease_duration_seconds: Some(config.lease_duration.num_seconds() as i32),
                lease_transitions: Some(0),
                renew_time: Some(MicroTime(now)),
            }),
        }
    }

    /// The default timeout for lease API calls.
    fn timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }
}
