use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::kv::{KvBackend, KvPair, KvWatch, MemoryBackend, TxnCompare};
use crate::models::proto::{Execution, ExecutionMode, FlowSpec, FlowStatus, KubernetesSettings};
use crate::models::encode_model;
use crate::store::{keys, FlowStore};

fn spec(name: &str, image: &str) -> FlowSpec {
    FlowSpec {
        name: name.into(),
        execution: Some(Execution { mode: ExecutionMode::Streaming as i32 }),
        kubernetes: Some(KubernetesSettings {
            image: Some(image.into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn store() -> (FlowStore<MemoryBackend>, Arc<MemoryBackend>) {
    let kv = Arc::new(MemoryBackend::new());
    (FlowStore::new(kv.clone()), kv)
}

#[tokio::test]
async fn create_flow_starts_at_version_one() -> Result<()> {
    let (store, kv) = store();

    let flow = store.create_flow(spec("orders", "r:1")).await?;
    assert_eq!(flow.version, 1);
    assert_eq!(flow.spec.as_ref().map(|s| s.version), Some(1));

    let active = kv.get("/flowpipe/flows/orders/active").await?.expect("active pointer");
    assert_eq!(active.value, b"1".to_vec());
    assert!(kv.get("/flowpipe/flows/orders/versions/1/spec").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn create_flow_requires_name() {
    let (store, _kv) = store();
    let err = store.create_flow(FlowSpec::default()).await.unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)), "got {:?}", err);
}

#[tokio::test]
async fn versions_are_strictly_increasing_without_gaps() -> Result<()> {
    let (store, kv) = store();

    store.create_flow(spec("orders", "r:1")).await?;
    for update in 2..=6u64 {
        let flow = store.update_flow("orders", spec("orders", &format!("r:{}", update))).await?;
        assert_eq!(flow.version, update);
    }

    for version in 1..=6u64 {
        let key = keys::version_spec_key("orders", version);
        assert!(kv.get(&key).await?.is_some(), "version {} should exist", version);
    }
    let active = kv.get(&keys::active_key("orders")).await?.unwrap();
    assert_eq!(active.value, b"6".to_vec());
    Ok(())
}

#[tokio::test]
async fn committed_versions_are_never_rewritten() -> Result<()> {
    let (store, kv) = store();
    store.create_flow(spec("orders", "r:1")).await?;
    let original = kv.get(&keys::version_spec_key("orders", 1)).await?.unwrap();

    store.update_flow("orders", spec("orders", "r:2")).await?;
    let after_update = kv.get(&keys::version_spec_key("orders", 1)).await?.unwrap();
    assert_eq!(original.value, after_update.value);
    Ok(())
}

/// A backend which commits a competing version between a store's read of the
/// active pointer and its transaction, exactly once.
struct IntercedingBackend {
    inner: Arc<MemoryBackend>,
    fired: AtomicBool,
    competing_version: u64,
}

impl IntercedingBackend {
    fn new(inner: Arc<MemoryBackend>, competing_version: u64) -> Self {
        Self { inner, fired: AtomicBool::new(false), competing_version }
    }
}

#[async_trait]
impl KvBackend for IntercedingBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<KvPair>> {
        self.inner.get(key).await
    }
    async fn get_prefix(&self, prefix: &str) -> StoreResult<Vec<KvPair>> {
        self.inner.get_prefix(prefix).await
    }
    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.inner.put(key, value).await
    }
    async fn txn_compare_put(
        &self,
        compare: TxnCompare,
        puts: Vec<(String, Vec<u8>)>,
    ) -> StoreResult<bool> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            // The competing writer lands its commit first.
            let version = self.competing_version;
            let mut competing = spec("orders", "r:competitor");
            competing.version = version;
            let bytes = encode_model(&competing).unwrap();
            self.inner
                .put(&keys::version_spec_key("orders", version), bytes)
                .await?;
            self.inner
                .put(&keys::active_key("orders"), version.to_string().into_bytes())
                .await?;
        }
        self.inner.txn_compare_put(compare, puts).await
    }
    async fn delete_prefix(&self, prefix: &str) -> StoreResult<()> {
        self.inner.delete_prefix(prefix).await
    }
    async fn watch_prefix(&self, prefix: &str) -> StoreResult<KvWatch> {
        self.inner.watch_prefix(prefix).await
    }
}

#[tokio::test]
async fn lost_create_race_is_a_conflict() -> Result<()> {
    let kv = Arc::new(IntercedingBackend::new(Arc::new(MemoryBackend::new()), 1));
    let store = FlowStore::new(kv.clone());

    // The create observes no active pointer, but a competitor lands version 1
    // before the transaction: the key-absent predicate fails.
    let err = store.create_flow(spec("orders", "r:loser")).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {:?}", err);

    // Retrying re-reads the now-present pointer and appends version 2.
    let flow = store.create_flow(spec("orders", "r:loser")).await?;
    assert_eq!(flow.version, 2);
    Ok(())
}

#[tokio::test]
async fn lost_update_race_is_a_conflict_and_retry_wins_next_version() -> Result<()> {
    let inner = Arc::new(MemoryBackend::new());
    FlowStore::new(inner.clone()).create_flow(spec("orders", "r:1")).await?;

    let kv = Arc::new(IntercedingBackend::new(inner, 2));
    let store = FlowStore::new(kv.clone());

    // First update observes version 1, but a competitor commits version 2
    // before the transaction lands: exactly one writer wins.
    let err = store.update_flow("orders", spec("orders", "r:loser")).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {:?}", err);

    // Retrying the loser re-reads and commits version 3; no number skipped.
    let flow = store.update_flow("orders", spec("orders", "r:loser")).await?;
    assert_eq!(flow.version, 3);
    for version in 1..=3u64 {
        assert!(kv.get(&keys::version_spec_key("orders", version)).await?.is_some());
    }
    Ok(())
}

#[tokio::test]
async fn get_flow_of_absent_name_is_not_found() {
    let (store, _kv) = store();
    let err = store.get_flow("missing").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn rollback_points_active_at_existing_version() -> Result<()> {
    let (store, kv) = store();
    store.create_flow(spec("orders", "r:1")).await?;
    store.update_flow("orders", spec("orders", "r:2")).await?;

    let flow = store.rollback_flow("orders", 1).await?;
    assert_eq!(flow.version, 1);
    assert_eq!(flow.spec.as_ref().and_then(|s| s.image()), Some("r:1"));

    // Rollback allocates no new version: both committed versions remain.
    assert!(kv.get(&keys::version_spec_key("orders", 1)).await?.is_some());
    assert!(kv.get(&keys::version_spec_key("orders", 2)).await?.is_some());
    let active = kv.get(&keys::active_key("orders")).await?.unwrap();
    assert_eq!(active.value, b"1".to_vec());
    Ok(())
}

#[tokio::test]
async fn rollback_to_absent_version_fails() -> Result<()> {
    let (store, _kv) = store();
    store.create_flow(spec("orders", "r:1")).await?;
    let err = store.rollback_flow("orders", 9).await.unwrap_err();
    assert!(
        matches!(err, StoreError::UnknownVersion { version: 9, .. }),
        "got {:?}",
        err
    );
    Ok(())
}

#[tokio::test]
async fn delete_flow_removes_entire_subtree_and_is_idempotent() -> Result<()> {
    let (store, kv) = store();
    store.create_flow(spec("orders", "r:1")).await?;
    store.update_flow("orders", spec("orders", "r:2")).await?;
    store.update_status("orders", FlowStatus::deploying(2, "orders-runtime".into(), "ok")).await?;

    store.delete_flow("orders").await?;
    assert!(kv.get_prefix("/flowpipe/flows/orders/").await?.is_empty());
    assert!(matches!(store.get_flow("orders").await, Err(StoreError::NotFound(_))));
    assert_eq!(store.get_flow_status("orders").await?, None);

    // Deleting an absent flow is not an error.
    store.delete_flow("orders").await?;
    Ok(())
}

#[tokio::test]
async fn delete_flow_leaves_prefix_sharing_names_alone() -> Result<()> {
    let (store, _kv) = store();
    store.create_flow(spec("orders", "r:1")).await?;
    store.create_flow(spec("orders-eu", "r:1")).await?;

    store.delete_flow("orders").await?;
    assert!(store.get_flow("orders-eu").await.is_ok());
    Ok(())
}

#[tokio::test]
async fn list_flows_is_best_effort_and_duplicate_free() -> Result<()> {
    let (store, kv) = store();
    store.create_flow(spec("orders", "r:1")).await?;
    store.create_flow(spec("billing", "r:1")).await?;

    // Corrupt one flow's spec; it must be skipped rather than failing the list.
    kv.put(&keys::version_spec_key("billing", 1), b"garbage".to_vec()).await?;

    let flows = store.list_flows().await?;
    let names: Vec<_> = flows.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["orders"]);
    Ok(())
}

#[tokio::test]
async fn status_round_trip_and_malformed_status_is_absent() -> Result<()> {
    let (store, kv) = store();
    store.create_flow(spec("orders", "r:1")).await?;

    assert_eq!(store.get_flow_status("orders").await?, None);

    let status = FlowStatus::deploying(1, "orders-runtime".into(), "runtime objects applied");
    store.update_status("orders", status.clone()).await?;
    let read = store.get_flow_status("orders").await?.expect("status should exist");
    assert_eq!(read, status);

    let flow = store.get_flow("orders").await?;
    assert_eq!(flow.status, Some(status));

    kv.put(&keys::status_key("orders"), b"garbage".to_vec()).await?;
    assert_eq!(store.get_flow_status("orders").await?, None);
    assert!(store.get_flow("orders").await.is_ok(), "status is advisory");
    Ok(())
}

#[tokio::test]
async fn get_active_flow_resolves_current_spec() -> Result<()> {
    let (store, _kv) = store();
    assert!(store.get_active_flow("orders").await?.is_none());

    store.create_flow(spec("orders", "r:1")).await?;
    store.update_flow("orders", spec("orders", "r:2")).await?;

    let (active_spec, version) = store.get_active_flow("orders").await?.expect("active spec");
    assert_eq!(version, 2);
    assert_eq!(active_spec.image(), Some("r:2"));
    Ok(())
}
