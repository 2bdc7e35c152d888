//! Thin capability layer over a consistent key-value backend.
//!
//! The stores in this crate are written against [`KvBackend`] rather than a
//! concrete client: the etcd-backed implementation is the production path,
//! while the in-memory implementation backs tests and local development.

mod etcd;
pub mod memory;

pub use etcd::EtcdBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::StoreResult;

/// A key-value pair read from the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

/// The kind of a raw backend watch event.
#[derive(Clone, Debug, PartialEq)]
pub enum KvEventKind {
    /// A key was written. `is_create` is true for the first write of a key.
    Put { is_create: bool },
    /// A key was deleted.
    Delete,
}

/// A raw watch event from the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct KvEvent {
    pub key: String,
    pub kind: KvEventKind,
}

/// The predicate of a transactional put.
#[derive(Clone, Debug)]
pub enum TxnCompare {
    /// The key must not exist (create revision zero).
    KeyAbsent(String),
    /// The key must hold exactly the given value.
    ValueEquals(String, Vec<u8>),
}

/// A handle over a live prefix watch.
///
/// Dropping the handle cancels the underlying watch.
pub struct KvWatch {
    rx: mpsc::Receiver<KvEvent>,
    pump: Option<JoinHandle<()>>,
}

impl KvWatch {
    pub(crate) fn new(rx: mpsc::Receiver<KvEvent>, pump: JoinHandle<()>) -> Self {
        Self { rx, pump: Some(pump) }
    }

    /// Await the next event; `None` indicates the watch has ended.
    pub async fn next(&mut self) -> Option<KvEvent> {
        self.rx.recv().await
    }
}

impl Drop for KvWatch {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// The capabilities the desired-state stores require of their backend.
#[async_trait]
pub trait KvBackend: Send + Sync + 'static {
    /// Point read of a single key.
    async fn get(&self, key: &str) -> StoreResult<Option<KvPair>>;

    /// Read all key-value pairs under the given prefix, ordered by key.
    async fn get_prefix(&self, prefix: &str) -> StoreResult<Vec<KvPair>>;

    /// Unconditional write of a single key.
    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Atomically apply all `puts` iff the predicate holds.
    ///
    /// Returns `false` when the predicate failed and nothing was written.
    async fn txn_compare_put(
        &self,
        compare: TxnCompare,
        puts: Vec<(String, Vec<u8>)>,
    ) -> StoreResult<bool>;

    /// Delete every key under the given prefix. Deleting nothing is not an error.
    async fn delete_prefix(&self, prefix: &str) -> StoreResult<()>;

    /// Open a watch over all keys under the given prefix.
    async fn watch_prefix(&self, prefix: &str) -> StoreResult<KvWatch>;
}
