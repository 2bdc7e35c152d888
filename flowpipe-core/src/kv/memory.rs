//! An in-memory KV implementation.
//!
//! All mutations run under a single lock, which gives the same linearizable
//! semantics the stores rely on from etcd. Used by tests and by local
//! development setups which have no etcd at hand.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::error::StoreResult;
use crate::kv::{KvBackend, KvEvent, KvEventKind, KvPair, KvWatch, TxnCompare};

/// Buffered capacity of the internal event fan-out.
const EVENT_BUFFER: usize = 64;

/// An in-memory implementation of [`KvBackend`].
pub struct MemoryBackend {
    state: Mutex<BTreeMap<String, Vec<u8>>>,
    events: broadcast::Sender<KvEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { state: Mutex::new(BTreeMap::new()), events }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a key and emit the corresponding watch event.
    ///
    /// Must be called with the state lock held via `state`.
    fn put_locked(&self, state: &mut BTreeMap<String, Vec<u8>>, key: String, value: Vec<u8>) {
        let is_create = !state.contains_key(&key);
        state.insert(key.clone(), value);
        let _ = self.events.send(KvEvent {
            key,
            kind: KvEventKind::Put { is_create },
        });
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<KvPair>> {
        let state = self.state.lock().expect("kv state lock poisoned");
        Ok(state.get(key).map(|value| KvPair {
            key: key.to_string(),
            value: value.clone(),
        }))
    }

    async fn get_prefix(&self, prefix: &str) -> StoreResult<Vec<KvPair>> {
        let state = self.state.lock().expect("kv state lock poisoned");
        Ok(state
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| KvPair {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut state = self.state.lock().expect("kv state lock poisoned");
        self.put_locked(&mut state, key.to_string(), value);
        Ok(())
    }

    async fn txn_compare_put(
        &self,
        compare: TxnCompare,
        puts: Vec<(String, Vec<u8>)>,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().expect("kv state lock poisoned");
        let holds = match &compare {
            TxnCompare::KeyAbsent(key) => !state.contains_key(key),
            TxnCompare::ValueEquals(key, value) => {
                state.get(key).map(|current| current == value).unwrap_or(false)
            }
        };
        if !holds {
            return Ok(false);
        }
        for (key, value) in puts {
            self.put_locked(&mut state, key, value);
        }
        Ok(true)
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<()> {
        let mut state = self.state.lock().expect("kv state lock poisoned");
        let doomed: Vec<String> = state
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            state.remove(&key);
            let _ = self.events.send(KvEvent { key, kind: KvEventKind::Delete });
        }
        Ok(())
    }

    async fn watch_prefix(&self, prefix: &str) -> StoreResult<KvWatch> {
        let mut source = self.events.subscribe();
        let prefix = prefix.to_string();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let pump = tokio::spawn(async move {
            loop {
                let event = match source.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "in-memory watch lagged, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if !event.key.starts_with(&prefix) {
                    continue;
                }
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        Ok(KvWatch::new(rx, pump))
    }
}
