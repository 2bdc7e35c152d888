//! Translation of raw KV watch events into typed flow events.

use crate::kv::{KvBackend, KvEvent, KvEventKind};
use crate::models::proto::FlowSpec;
use crate::store::keys;
use crate::store::FlowStore;

/// The kind of a typed flow watch event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowWatchEventKind {
    Added,
    Updated,
    Deleted,
}

/// A typed flow watch event.
#[derive(Clone, Debug)]
pub struct FlowWatchEvent {
    pub kind: FlowWatchEventKind,
    pub name: String,
    /// The active spec at translation time; always absent for deletes.
    pub spec: Option<FlowSpec>,
}

/// Translate a raw KV event into zero or one typed flow event.
///
/// Only active-pointer keys produce events. For non-deletes the active spec
/// is resolved through the store; a failed resolution suppresses the event,
/// which is safe because a later spec write or a full-list reseed on
/// reconnect re-delivers the key.
pub async fn translate_event<B: KvBackend>(
    store: &FlowStore<B>,
    event: &KvEvent,
) -> Option<FlowWatchEvent> {
    let name = keys::flow_name_from_active_key(&event.key)?;

    match event.kind {
        KvEventKind::Delete => Some(FlowWatchEvent {
            kind: FlowWatchEventKind::Deleted,
            name: name.to_string(),
            spec: None,
        }),
        KvEventKind::Put { is_create } => {
            let kind = if is_create {
                FlowWatchEventKind::Added
            } else {
                FlowWatchEventKind::Updated
            };
            match store.get_active_flow(name).await {
                Ok(Some((spec, _version))) => Some(FlowWatchEvent {
                    kind,
                    name: name.to_string(),
                    spec: Some(spec),
                }),
                Ok(None) => None,
                Err(err) => {
                    tracing::debug!(error = ?err, flow = %name, "suppressing watch event, active spec unresolvable");
                    None
                }
            }
        }
    }
}
