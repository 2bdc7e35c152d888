//! The etcd-backed KV implementation.

use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{
    Client, Compare, CompareOp, ConnectOptions, DeleteOptions, EventType, GetOptions, Txn, TxnOp,
    WatchOptions,
};
use tokio::sync::mpsc;

use crate::error::{StoreError, StoreResult};
use crate::kv::{KvBackend, KvEvent, KvEventKind, KvPair, KvWatch, TxnCompare};

/// The timeout used when establishing the backend connection.
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
/// Buffered capacity of a watch channel.
const WATCH_BUFFER: usize = 16;

/// An etcd v3 backed implementation of [`KvBackend`].
///
/// The client multiplexes all calls over a shared channel and is cheap to
/// clone; the backend is therefore safe to share behind an `Arc`.
#[derive(Clone)]
pub struct EtcdBackend {
    client: Client,
}

impl EtcdBackend {
    /// Connect to the given etcd endpoints.
    pub async fn connect(endpoints: Vec<String>) -> StoreResult<Self> {
        let options = ConnectOptions::new().with_timeout(DIAL_TIMEOUT);
        let client = Client::connect(endpoints, Some(options))
            .await
            .map_err(StoreError::backend)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl KvBackend for EtcdBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<KvPair>> {
        let mut kv = self.client.kv_client();
        let resp = kv.get(key, None).await.map_err(StoreError::backend)?;
        let pair = match resp.kvs().first() {
            Some(entry) => entry,
            None => return Ok(None),
        };
        Ok(Some(KvPair {
            key: entry_key(pair)?,
            value: pair.value().to_vec(),
        }))
    }

    async fn get_prefix(&self, prefix: &str) -> StoreResult<Vec<KvPair>> {
        let mut kv = self.client.kv_client();
        let resp = kv
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await
            .map_err(StoreError::backend)?;
        let mut out = Vec::with_capacity(resp.kvs().len());
        for pair in resp.kvs() {
            out.push(KvPair {
                key: entry_key(pair)?,
                value: pair.value().to_vec(),
            });
        }
        Ok(out)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut kv = self.client.kv_client();
        kv.put(key, value, None).await.map_err(StoreError::backend)?;
        Ok(())
    }

    async fn txn_compare_put(
        &self,
        compare: TxnCompare,
        puts: Vec<(String, Vec<u8>)>,
    ) -> StoreResult<bool> {
        let when = match compare {
            TxnCompare::KeyAbsent(key) => Compare::create_revision(key, CompareOp::Equal, 0),
            TxnCompare::ValueEquals(key, value) => Compare::value(key, CompareOp::Equal, value),
        };
        let actions: Vec<_> = puts
            .into_iter()
            .map(|(key, value)| TxnOp::put(key, value, None))
            .collect();
        let txn = Txn::new().when(vec![when]).and_then(actions);

        let mut kv = self.client.kv_client();
        let resp = kv.txn(txn).await.map_err(StoreError::backend)?;
        Ok(resp.succeeded())
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<()> {
        let mut kv = self.client.kv_client();
        kv.delete(prefix, Some(DeleteOptions::new().with_prefix()))
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn watch_prefix(&self, prefix: &str) -> StoreResult<KvWatch> {
        let mut watch_client = self.client.watch_client();
        let (watcher, mut stream) = watch_client
            .watch(prefix, Some(WatchOptions::new().with_prefix()))
            .await
            .map_err(StoreError::backend)?;

        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let pump = tokio::spawn(async move {
            // The watcher handle is held here so the watch stays registered
            // for as long as the pump lives.
            let _watcher = watcher;
            loop {
                let resp = match stream.message().await {
                    Ok(Some(resp)) => resp,
                    Ok(None) => break,
                    Err(err) => {
                        tracing::error!(error = ?err, "error from etcd watch stream");
                        break;
                    }
                };
                for event in resp.events() {
                    let pair = match event.kv() {
                        Some(pair) => pair,
                        None => continue,
                    };
                    let key = match pair.key_str() {
                        Ok(key) => key.to_string(),
                        Err(_) => continue,
                    };
                    let kind = match event.event_type() {
                        EventType::Put => KvEventKind::Put { is_create: pair.version() == 1 },
                        EventType::Delete => KvEventKind::Delete,
                    };
                    if tx.send(KvEvent { key, kind }).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(KvWatch::new(rx, pump))
    }
}

/// Extract the UTF-8 key of an etcd key-value entry.
fn entry_key(pair: &etcd_client::KeyValue) -> StoreResult<String> {
    pair.key_str()
        .map(|key| key.to_string())
        .map_err(StoreError::backend)
}
