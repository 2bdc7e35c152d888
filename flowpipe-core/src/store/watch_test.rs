use std::sync::Arc;

use anyhow::Result;

use crate::kv::{KvEvent, KvEventKind, MemoryBackend};
use crate::models::proto::{FlowSpec, KubernetesSettings};
use crate::store::{translate_event, FlowStore, FlowWatchEventKind};

fn spec(name: &str) -> FlowSpec {
    FlowSpec {
        name: name.into(),
        kubernetes: Some(KubernetesSettings {
            image: Some("r:1".into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn put_event(key: &str, is_create: bool) -> KvEvent {
    KvEvent { key: key.into(), kind: KvEventKind::Put { is_create } }
}

#[tokio::test]
async fn create_put_translates_to_added_with_spec() -> Result<()> {
    let store = FlowStore::new(Arc::new(MemoryBackend::new()));
    store.create_flow(spec("orders")).await?;

    let event = translate_event(&store, &put_event("/flowpipe/flows/orders/active", true))
        .await
        .expect("expected a translated event");
    assert_eq!(event.kind, FlowWatchEventKind::Added);
    assert_eq!(event.name, "orders");
    assert_eq!(event.spec.as_ref().and_then(|s| s.image()), Some("r:1"));
    Ok(())
}

#[tokio::test]
async fn non_create_put_translates_to_updated() -> Result<()> {
    let store = FlowStore::new(Arc::new(MemoryBackend::new()));
    store.create_flow(spec("orders")).await?;

    let event = translate_event(&store, &put_event("/flowpipe/flows/orders/active", false))
        .await
        .expect("expected a translated event");
    assert_eq!(event.kind, FlowWatchEventKind::Updated);
    Ok(())
}

#[tokio::test]
async fn delete_translates_without_spec_resolution() {
    let store = FlowStore::new(Arc::new(MemoryBackend::new()));

    // No flow exists; deletes must still translate.
    let event = translate_event(
        &store,
        &KvEvent {
            key: "/flowpipe/flows/orders/active".into(),
            kind: KvEventKind::Delete,
        },
    )
    .await
    .expect("expected a translated event");
    assert_eq!(event.kind, FlowWatchEventKind::Deleted);
    assert_eq!(event.name, "orders");
    assert!(event.spec.is_none());
}

#[tokio::test]
async fn non_active_keys_are_ignored() -> Result<()> {
    let store = FlowStore::new(Arc::new(MemoryBackend::new()));
    store.create_flow(spec("orders")).await?;

    for key in [
        "/flowpipe/flows/orders/status",
        "/flowpipe/flows/orders/versions/1/spec",
    ] {
        assert!(translate_event(&store, &put_event(key, false)).await.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn unresolvable_spec_suppresses_the_event() {
    let store = FlowStore::new(Arc::new(MemoryBackend::new()));

    // The active pointer event arrives but the flow's keys are gone.
    let suppressed =
        translate_event(&store, &put_event("/flowpipe/flows/ghost/active", false)).await;
    assert!(suppressed.is_none());
}
