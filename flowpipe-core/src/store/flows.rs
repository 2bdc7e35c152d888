//! The versioned flow spec store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::timeout;

use crate::error::{StoreError, StoreResult};
use crate::kv::{KvBackend, KvPair, KvWatch, TxnCompare};
use crate::models::proto::{Flow, FlowSpec, FlowStatus};
use crate::models::{decode_model, encode_model};
use crate::store::keys;

/// The deadline applied to every backend call.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Versioned flow CRUD over a KV backend.
///
/// Version allocation is CAS-guarded: concurrent writers observing the same
/// active pointer race on a compare-and-swap transaction and exactly one
/// wins. The store itself never retries a lost race.
pub struct FlowStore<B> {
    kv: Arc<B>,
}

impl<B> Clone for FlowStore<B> {
    fn clone(&self) -> Self {
        Self { kv: self.kv.clone() }
    }
}

impl<B: KvBackend> FlowStore<B> {
    /// Create a new instance.
    pub fn new(kv: Arc<B>) -> Self {
        Self { kv }
    }

    /// Create a flow from the given spec; its first version is always 1.
    pub async fn create_flow(&self, spec: FlowSpec) -> StoreResult<Flow> {
        if spec.name.is_empty() {
            return Err(StoreError::Invalid("flow name is required".into()));
        }
        let name = spec.name.clone();
        self.create_new_version(&name, spec).await
    }

    /// Append a new version of the named flow and swap the active pointer.
    pub async fn update_flow(&self, name: &str, mut spec: FlowSpec) -> StoreResult<Flow> {
        if name.is_empty() {
            return Err(StoreError::Invalid("flow name is required".into()));
        }
        spec.name = name.to_string();
        self.create_new_version(name, spec).await
    }

    /// Shared version-creation logic.
    ///
    /// The transaction predicate pins the active pointer to the value read in
    /// step one (or to its absence), so a lost race surfaces as `Conflict`
    /// and no version number is ever skipped or reused.
    async fn create_new_version(&self, name: &str, mut spec: FlowSpec) -> StoreResult<Flow> {
        let active_key = keys::active_key(name);
        let current = self.deadline(self.kv.get(&active_key)).await?;

        let (compare, next_version) = match &current {
            Some(pair) => {
                let prev = parse_version(pair)?;
                (
                    TxnCompare::ValueEquals(active_key.clone(), pair.value.clone()),
                    prev + 1,
                )
            }
            None => (TxnCompare::KeyAbsent(active_key.clone()), 1),
        };

        spec.version = next_version;
        let spec_bytes = encode_model(&spec).map_err(StoreError::Backend)?;

        let committed = self
            .deadline(self.kv.txn_compare_put(
                compare,
                vec![
                    (keys::version_spec_key(name, next_version), spec_bytes),
                    (active_key, next_version.to_string().into_bytes()),
                ],
            ))
            .await?;
        if !committed {
            return Err(StoreError::Conflict(format!("flow {:?}", name)));
        }

        Ok(Flow {
            name: name.to_string(),
            version: next_version,
            spec: Some(spec),
            status: None,
        })
    }

    /// Fetch the named flow at its active version, along with any status.
    pub async fn get_flow(&self, name: &str) -> StoreResult<Flow> {
        let active = self
            .deadline(self.kv.get(&keys::active_key(name)))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("flow {:?}", name)))?;
        let version = parse_version(&active)?;

        let spec_pair = self
            .deadline(self.kv.get(&keys::version_spec_key(name, version)))
            .await?
            .ok_or_else(|| {
                StoreError::Backend(anyhow!("spec missing for flow {:?} version {}", name, version))
            })?;
        let spec: FlowSpec = decode_model(&spec_pair.value).map_err(StoreError::Backend)?;

        // Status is advisory; a missing or unreadable status never fails the read.
        let status = self.get_flow_status(name).await.unwrap_or(None);

        Ok(Flow {
            name: name.to_string(),
            version,
            spec: Some(spec),
            status,
        })
    }

    /// List all flows at their active versions.
    ///
    /// Best-effort per entry: flows whose spec read fails are skipped.
    pub async fn list_flows(&self) -> StoreResult<Vec<Flow>> {
        let mut out = Vec::new();
        for name in self.list_flow_names().await? {
            match self.get_flow(&name).await {
                Ok(flow) => out.push(flow),
                Err(err) => {
                    tracing::warn!(error = ?err, flow = %name, "skipping unreadable flow during list");
                }
            }
        }
        Ok(out)
    }

    /// List the names of all flows which currently have an active pointer.
    pub async fn list_flow_names(&self) -> StoreResult<Vec<String>> {
        let pairs = self
            .deadline(self.kv.get_prefix(&keys::flows_watch_prefix()))
            .await?;
        let mut names = Vec::new();
        for pair in &pairs {
            if let Some(name) = keys::flow_name_from_active_key(&pair.key) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Delete the named flow's entire subtree: every version, the active
    /// pointer and any status. Deleting an absent flow is not an error.
    pub async fn delete_flow(&self, name: &str) -> StoreResult<()> {
        self.deadline(self.kv.delete_prefix(&keys::flow_subtree(name)))
            .await
    }

    /// Fetch the controller-owned status of the named flow.
    ///
    /// A missing or malformed status decodes to `None`.
    pub async fn get_flow_status(&self, name: &str) -> StoreResult<Option<FlowStatus>> {
        let pair = match self.deadline(self.kv.get(&keys::status_key(name))).await? {
            Some(pair) => pair,
            None => return Ok(None),
        };
        Ok(decode_model(&pair.value).ok())
    }

    /// Point the active pointer of the named flow at an existing version.
    ///
    /// Rollback allocates no new version. The put is unconditional: a
    /// concurrent update racing a rollback may observe either outcome.
    pub async fn rollback_flow(&self, name: &str, version: u64) -> StoreResult<Flow> {
        let spec_key = keys::version_spec_key(name, version);
        if self.deadline(self.kv.get(&spec_key)).await?.is_none() {
            return Err(StoreError::UnknownVersion { name: name.to_string(), version });
        }

        self.deadline(
            self.kv
                .put(&keys::active_key(name), version.to_string().into_bytes()),
        )
        .await?;

        self.get_flow(name).await
    }

    /// Resolve the active spec of the named flow for reconciliation.
    ///
    /// An absent active pointer or spec resolves to `None` (the flow was
    /// deleted, or is transiently incomplete); backend failures propagate.
    pub async fn get_active_flow(&self, name: &str) -> StoreResult<Option<(FlowSpec, u64)>> {
        let active = match self.deadline(self.kv.get(&keys::active_key(name))).await? {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let version = parse_version(&active)?;

        let spec_pair = match self
            .deadline(self.kv.get(&keys::version_spec_key(name, version)))
            .await?
        {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let spec: FlowSpec = decode_model(&spec_pair.value).map_err(StoreError::Backend)?;
        Ok(Some((spec, version)))
    }

    /// Write the controller-owned status of the named flow.
    pub async fn update_status(&self, name: &str, status: FlowStatus) -> StoreResult<()> {
        let bytes = encode_model(&status).map_err(StoreError::Backend)?;
        self.deadline(self.kv.put(&keys::status_key(name), bytes)).await
    }

    /// Open a raw watch over the flow desired-state prefix.
    pub async fn watch(&self) -> StoreResult<KvWatch> {
        self.kv.watch_prefix(&keys::flows_watch_prefix()).await
    }

    /// Apply the per-call deadline to a backend operation.
    async fn deadline<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match timeout(OP_TIMEOUT, op).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Cancelled),
        }
    }
}

/// Parse an ascii-decimal active pointer value.
fn parse_version(pair: &KvPair) -> StoreResult<u64> {
    std::str::from_utf8(&pair.value)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or_else(|| StoreError::Backend(anyhow!("invalid active version pointer at {:?}", pair.key)))
}
