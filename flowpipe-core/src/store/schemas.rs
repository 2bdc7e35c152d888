//! The schema registry store.
//!
//! Versioning follows the same discipline as the flow store: an
//! ascii-decimal active pointer plus immutable version entries, allocated
//! under a compare-and-swap transaction.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::timeout;

use crate::error::{StoreError, StoreResult};
use crate::kv::{KvBackend, KvPair, TxnCompare};
use crate::models::SchemaDefinition;
use crate::store::keys;

/// The deadline applied to every backend call.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Versioned schema CRUD over a KV backend.
pub struct SchemaRegistry<B> {
    kv: Arc<B>,
}

impl<B> Clone for SchemaRegistry<B> {
    fn clone(&self) -> Self {
        Self { kv: self.kv.clone() }
    }
}

impl<B: KvBackend> SchemaRegistry<B> {
    /// Create a new instance.
    pub fn new(kv: Arc<B>) -> Self {
        Self { kv }
    }

    /// Register a new schema version; the first version is always 1.
    pub async fn create_schema(&self, schema: SchemaDefinition) -> StoreResult<SchemaDefinition> {
        if schema.registry_id.is_empty() {
            return Err(StoreError::Invalid("schema registry id is required".into()));
        }
        if schema.format().is_none() {
            return Err(StoreError::Invalid("schema format is required".into()));
        }
        if schema.raw_schema.is_empty() {
            return Err(StoreError::Invalid("schema payload is required".into()));
        }
        self.create_schema_version(schema).await
    }

    /// Shared version-creation logic, CAS-guarded like the flow store.
    async fn create_schema_version(
        &self,
        mut schema: SchemaDefinition,
    ) -> StoreResult<SchemaDefinition> {
        let registry_id = schema.registry_id.clone();
        let active_key = keys::schema_active_key(&registry_id);
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

        schema.version = next_version;
        let payload = serde_json::to_vec(&schema)
            .map_err(|err| StoreError::Backend(anyhow!("error serializing schema: {}", err)))?;

        let committed = self
            .deadline(self.kv.txn_compare_put(
                compare,
                vec![
                    (keys::schema_version_key(&registry_id, next_version), payload),
                    (active_key, next_version.to_string().into_bytes()),
                ],
            ))
            .await?;
        if !committed {
            return Err(StoreError::Conflict(format!("schema {:?}", registry_id)));
        }

        Ok(schema)
    }

    /// Fetch a schema version; version 0 resolves via the active pointer.
    pub async fn get_schema(
        &self,
        registry_id: &str,
        version: u32,
    ) -> StoreResult<SchemaDefinition> {
        if registry_id.is_empty() {
            return Err(StoreError::Invalid("schema registry id is required".into()));
        }

        let version = if version == 0 {
            let active = self
                .deadline(self.kv.get(&keys::schema_active_key(registry_id)))
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("schema {:?}", registry_id)))?;
            parse_version(&active)?
        } else {
            version
        };

        let pair = self
            .deadline(self.kv.get(&keys::schema_version_key(registry_id, version)))
            .await?
            .ok_or_else(|| StoreError::UnknownVersion {
                name: registry_id.to_string(),
                version: version as u64,
            })?;

        decode_schema(&pair)
    }

    /// List all versions of the given registry id, ascending by version.
    pub async fn list_schema_versions(
        &self,
        registry_id: &str,
    ) -> StoreResult<Vec<SchemaDefinition>> {
        if registry_id.is_empty() {
            return Err(StoreError::Invalid("schema registry id is required".into()));
        }

        let pairs = self
            .deadline(self.kv.get_prefix(&keys::schema_versions_prefix(registry_id)))
            .await?;
        let mut schemas = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            schemas.push(decode_schema(pair)?);
        }
        schemas.sort_by_key(|schema| schema.version);
        Ok(schemas)
    }

    /// Delete the registry id's entire subtree. Idempotent.
    pub async fn delete_schema(&self, registry_id: &str) -> StoreResult<()> {
        if registry_id.is_empty() {
            return Err(StoreError::Invalid("schema registry id is required".into()));
        }
        self.deadline(self.kv.delete_prefix(&keys::schema_subtree(registry_id)))
            .await
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
fn parse_version(pair: &KvPair) -> StoreResult<u32> {
    std::str::from_utf8(&pair.value)
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .ok_or_else(|| StoreError::Backend(anyhow!("invalid active version pointer at {:?}", pair.key)))
}

/// Decode a stored schema definition.
fn decode_schema(pair: &KvPair) -> StoreResult<SchemaDefinition> {
    serde_json::from_slice(&pair.value)
        .map_err(|err| StoreError::Backend(anyhow!("error decoding schema at {:?}: {}", pair.key, err)))
}
