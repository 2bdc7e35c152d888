use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;

use flowpipe_core::kv::MemoryBackend;
use flowpipe_core::models::proto::{FlowSpec, FlowState, KubernetesSettings};
use flowpipe_core::store::FlowStore;

use super::{reconcile, Controller};
use crate::k8s::runtime::RuntimeBackend;

/// A cluster stand-in recording calls, optionally failing the first N ensures.
#[derive(Default)]
struct FakeRuntime {
    fail_remaining: AtomicU32,
    ensured: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeRuntime {
    fn failing(times: u32) -> Self {
        Self {
            fail_remaining: AtomicU32::new(times),
            ..Default::default()
        }
    }

    fn ensured(&self) -> Vec<String> {
        self.ensured.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuntimeBackend for FakeRuntime {
    async fn ensure(&self, spec: &FlowSpec) -> Result<String> {
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            bail!("transient cluster failure");
        }
        self.ensured.lock().unwrap().push(spec.name.clone());
        Ok(format!("{}-runtime", spec.name))
    }

    async fn delete_all(&self, name: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

fn spec(name: &str, image: &str) -> FlowSpec {
    FlowSpec {
        name: name.into(),
        kubernetes: Some(KubernetesSettings {
            image: Some(image.into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn store() -> FlowStore<MemoryBackend> {
    FlowStore::new(Arc::new(MemoryBackend::new()))
}

/// Poll attempts with a short sleep between them; panics when they run out.
macro_rules! wait_for {
    ($what:expr, $check:expr) => {
        let mut passed = false;
        for _ in 0..200u32 {
            if $check {
                passed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        if !passed {
            panic!("timed out waiting for {}", $what);
        }
    };
}

#[tokio::test]
async fn reconcile_applies_runtime_and_writes_status() -> Result<()> {
    let store = store();
    let runtime = FakeRuntime::default();
    store.create_flow(spec("orders", "r:1")).await?;
    store.update_flow("orders", spec("orders", "r:2")).await?;

    reconcile(&store, &runtime, "orders").await?;

    assert_eq!(runtime.ensured(), vec!["orders".to_string()]);
    let status = store.get_flow_status("orders").await?.expect("status written");
    assert_eq!(status.state, FlowState::Deploying as i32);
    assert_eq!(status.active_version, 2);
    assert_eq!(status.workload, "orders-runtime");
    assert!(status.updated_at_unix_ms > 0);
    Ok(())
}

#[tokio::test]
async fn reconcile_is_idempotent() -> Result<()> {
    let store = store();
    let runtime = FakeRuntime::default();
    store.create_flow(spec("orders", "r:1")).await?;

    reconcile(&store, &runtime, "orders").await?;
    let first = store.get_flow_status("orders").await?.expect("status written");
    reconcile(&store, &runtime, "orders").await?;
    let second = store.get_flow_status("orders").await?.expect("status written");

    assert_eq!(runtime.ensured(), vec!["orders".to_string(), "orders".to_string()]);
    assert_eq!(first.active_version, second.active_version);
    assert_eq!(first.workload, second.workload);
    assert_eq!(first.state, second.state);
    Ok(())
}

#[tokio::test]
async fn reconcile_of_absent_flow_deletes_runtime_objects() -> Result<()> {
    let store = store();
    let runtime = FakeRuntime::default();

    reconcile(&store, &runtime, "ghost").await?;
    assert!(runtime.ensured().is_empty());
    assert_eq!(runtime.deleted(), vec!["ghost".to_string()]);

    // Running the delete path again converges the same way.
    reconcile(&store, &runtime, "ghost").await?;
    assert_eq!(runtime.deleted(), vec!["ghost".to_string(), "ghost".to_string()]);
    Ok(())
}

#[tokio::test]
async fn controller_seeds_watches_and_converges() -> Result<()> {
    let store = store();
    let runtime = Arc::new(FakeRuntime::default());
    store.create_flow(spec("orders", "r:1")).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let controller = Controller::new(store.clone(), runtime.clone(), 2, shutdown_tx.clone());
    let handle = controller.spawn();

    // The seeded flow reconciles without any watch traffic.
    wait_for!("seeded flow status", {
        store.get_flow_status("orders").await.ok().flatten().is_some()
    });

    // A new flow arrives through the watch stream.
    store.create_flow(spec("billing", "r:1")).await?;
    wait_for!("watched flow ensure", {
        runtime.ensured().iter().any(|name| name == "billing")
    });

    // Deleting a flow converges on deletion of its runtime objects.
    store.delete_flow("orders").await?;
    wait_for!("runtime deletion", {
        runtime.deleted().iter().any(|name| name == "orders")
    });

    let _ = shutdown_tx.send(());
    handle.await??;
    Ok(())
}

#[tokio::test]
async fn worker_survives_transient_failures() -> Result<()> {
    let store = store();
    // The first two ensure calls fail; the queue's back-off retries them.
    let runtime = Arc::new(FakeRuntime::failing(2));
    store.create_flow(spec("orders", "r:1")).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let controller = Controller::new(store.clone(), runtime.clone(), 1, shutdown_tx.clone());
    let handle = controller.spawn();

    wait_for!("status after retries", {
        store.get_flow_status("orders").await.ok().flatten().is_some()
    });
    assert_eq!(runtime.ensured(), vec!["orders".to_string()]);

    let _ = shutdown_tx.send(());
    handle.await??;
    Ok(())
}
