//! The reconciliation work queue.
//!
//! A rate-limited, deduplicating queue over flow names. Keys wait in a ready
//! list, are handed to exactly one worker at a time, and re-adds observed
//! while a key is in flight coalesce into a single re-delivery once the key
//! is released with [`WorkQueue::forget`] or [`WorkQueue::retry`]. Failed
//! keys come back after a per-key exponential back-off.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::time::Instant;

/// The first retry back-off of a failing key.
const BASE_DELAY: Duration = Duration::from_millis(5);
/// The back-off ceiling of a failing key.
const MAX_DELAY: Duration = Duration::from_secs(1000);
/// The jitter applied around a computed back-off.
const JITTER_RATIO: f64 = 0.1;

const METRIC_QUEUE_DEPTH: &str = "flowpipe_controller_workqueue_depth";

/// A shareable handle over the work queue.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    notify: Notify,
}

#[derive(Default)]
struct QueueState {
    /// Keys ready for delivery, in arrival order.
    ready: VecDeque<String>,
    /// Membership index of `ready`.
    queued: HashSet<String>,
    /// Keys currently held by a worker.
    in_flight: HashSet<String>,
    /// Keys re-added while in flight; re-delivered exactly once on release.
    redo: HashSet<String>,
    /// Consecutive failure counts per key.
    failures: HashMap<String, u32>,
    /// First-insertion instants of currently queued keys.
    added_at: HashMap<String, Instant>,
    shut_down: bool,
}

impl Default for WorkQueue {
    fn default() -> Self {
        metrics::register_gauge!(
            METRIC_QUEUE_DEPTH,
            metrics::Unit::Count,
            "the number of keys waiting in the reconciliation work queue"
        );
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
            }),
        }
    }
}

impl WorkQueue {
    /// Create a new instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key unless it is already waiting.
    ///
    /// Adding an in-flight key marks it for exactly one re-delivery after it
    /// is released. Adding to a shut-down queue is a no-op.
    pub fn add(&self, key: &str) {
        let mut state = self.lock();
        if state.shut_down {
            return;
        }
        if state.in_flight.contains(key) {
            state.redo.insert(key.to_string());
            return;
        }
        if !state.queued.insert(key.to_string()) {
            return;
        }
        state
            .added_at
            .entry(key.to_string())
            .or_insert_with(Instant::now);
        state.ready.push_back(key.to_string());
        metrics::gauge!(METRIC_QUEUE_DEPTH, state.ready.len() as f64);
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Await the next ready key and mark it in flight.
    ///
    /// The returned duration is the key's queue lag: the time between its
    /// first insertion and this delivery. Returns `None` once the queue has
    /// been shut down and the ready list has drained.
    pub async fn get(&self) -> Option<(String, Duration)> {
        loop {
            {
                let mut state = self.lock();
                if let Some(key) = state.ready.pop_front() {
                    state.queued.remove(&key);
                    state.in_flight.insert(key.clone());
                    let lag = state
                        .added_at
                        .remove(&key)
                        .map(|instant| instant.elapsed())
                        .unwrap_or_default();
                    metrics::gauge!(METRIC_QUEUE_DEPTH, state.ready.len() as f64);
                    let more = !state.ready.is_empty();
                    drop(state);
                    if more {
                        // Chain the wake-up so sibling waiters drain the rest.
                        self.inner.notify.notify_one();
                    }
                    return Some((key, lag));
                }
                if state.shut_down {
                    return None;
                }
            }
            self.inner.notify.notified().await;
        }
    }

    /// Release a key after successful processing, clearing its retry state.
    pub fn forget(&self, key: &str) {
        let mut state = self.lock();
        state.failures.remove(key);
        state.in_flight.remove(key);
        if state.redo.remove(key) {
            Self::requeue(&mut state, key);
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Release a key after a failure and schedule a rate-limited re-add.
    pub fn retry(&self, key: &str) {
        let attempts = {
            let mut state = self.lock();
            state.in_flight.remove(key);
            state.redo.remove(key);
            let attempts = state.failures.entry(key.to_string()).or_insert(0);
            *attempts += 1;
            *attempts
        };

        let delay = jittered(backoff_for(attempts));
        let queue = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(&key);
        });
    }

    /// The number of keys currently waiting for delivery.
    pub fn len(&self) -> usize {
        self.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shut the queue down. Idempotent; blocked `get` calls return `None`
    /// once the remaining ready keys have drained.
    pub fn shutdown(&self) {
        {
            let mut state = self.lock();
            state.shut_down = true;
        }
        self.inner.notify.notify_waiters();
        // A stored permit covers waiters which registered after the flag flip.
        self.inner.notify.notify_one();
    }

    fn requeue(state: &mut QueueState, key: &str) {
        if state.queued.insert(key.to_string()) {
            state
                .added_at
                .entry(key.to_string())
                .or_insert_with(Instant::now);
            state.ready.push_back(key.to_string());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.inner.state.lock().expect("work queue lock poisoned")
    }
}

/// The raw exponential back-off for the given consecutive failure count.
pub(crate) fn backoff_for(attempts: u32) -> Duration {
    let exp = attempts.saturating_sub(1).min(63);
    let delay = BASE_DELAY.as_secs_f64() * 2f64.powi(exp as i32);
    Duration::from_secs_f64(delay.min(MAX_DELAY.as_secs_f64()))
}

/// Apply bounded jitter around the given delay.
fn jittered(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(1.0 - JITTER_RATIO..1.0 + JITTER_RATIO);
    delay.mul_f64(factor)
}
