use std::time::Duration;

use super::queue::{backoff_for, WorkQueue};

#[tokio::test]
async fn add_deduplicates_waiting_keys() {
    let queue = WorkQueue::new();
    queue.add("orders");
    queue.add("orders");
    queue.add("billing");
    assert_eq!(queue.len(), 2);

    let (first, _lag) = queue.get().await.expect("queue open");
    let (second, _lag) = queue.get().await.expect("queue open");
    assert_eq!(first, "orders");
    assert_eq!(second, "billing");
    assert_eq!(queue.len(), 0);
}

#[tokio::test]
async fn at_most_one_in_flight_instance_per_key() {
    let queue = WorkQueue::new();
    queue.add("orders");
    let (key, _lag) = queue.get().await.expect("queue open");
    assert_eq!(key, "orders");

    // Re-adds while in flight must not make the key deliverable again yet.
    queue.add("orders");
    queue.add("orders");
    assert_eq!(queue.len(), 0);

    // Releasing the key re-delivers it exactly once.
    queue.forget("orders");
    assert_eq!(queue.len(), 1);
    let (key, _lag) = queue.get().await.expect("queue open");
    assert_eq!(key, "orders");
    queue.forget("orders");
    assert_eq!(queue.len(), 0);
}

#[tokio::test]
async fn forget_without_pending_redo_does_not_requeue() {
    let queue = WorkQueue::new();
    queue.add("orders");
    let _ = queue.get().await.expect("queue open");
    queue.forget("orders");
    assert_eq!(queue.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn retry_redelivers_after_backoff() {
    let queue = WorkQueue::new();
    queue.add("orders");
    let _ = queue.get().await.expect("queue open");

    queue.retry("orders");
    assert_eq!(queue.len(), 0, "retried key must wait out its back-off");

    // Paused time: sleeping far past the first back-off fires the re-add.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let (key, _lag) = queue.get().await.expect("queue open");
    assert_eq!(key, "orders");
}

#[tokio::test(start_paused = true)]
async fn queue_lag_measures_wait_time() {
    let queue = WorkQueue::new();
    queue.add("orders");
    tokio::time::sleep(Duration::from_secs(3)).await;
    let (_key, lag) = queue.get().await.expect("queue open");
    assert!(lag >= Duration::from_secs(3), "lag was {:?}", lag);
}

#[tokio::test]
async fn shutdown_drains_then_closes() {
    let queue = WorkQueue::new();
    queue.add("orders");
    queue.shutdown();

    // Remaining ready keys drain before the closed signal.
    let (key, _lag) = queue.get().await.expect("pre-shutdown key should drain");
    assert_eq!(key, "orders");
    assert!(queue.get().await.is_none());

    // Closing is idempotent and adds after shutdown are dropped.
    queue.shutdown();
    queue.add("late");
    assert!(queue.get().await.is_none());
}

#[tokio::test]
async fn shutdown_wakes_blocked_getters() {
    let queue = WorkQueue::new();
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.get().await })
    };
    // Give the waiter a chance to block.
    tokio::task::yield_now().await;
    queue.shutdown();
    let got = waiter.await.expect("waiter task panicked");
    assert!(got.is_none());
}

#[tokio::test]
async fn concurrent_producers_and_consumers_deliver_every_key() {
    let queue = WorkQueue::new();

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some((key, _lag)) = queue.get().await {
                    queue.forget(&key);
                    seen.push(key);
                }
                seen
            })
        })
        .collect();

    for batch in 0..10 {
        for flow in 0..10 {
            queue.add(&format!("flow-{}-{}", batch, flow));
        }
        tokio::task::yield_now().await;
    }

    // Let consumers drain, then close.
    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.shutdown();

    let mut all = Vec::new();
    for consumer in consumers {
        all.extend(consumer.await.expect("consumer panicked"));
    }
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 100, "every distinct key must be delivered");
}

#[test]
fn backoff_grows_exponentially_to_a_cap() {
    assert_eq!(backoff_for(1), Duration::from_millis(5));
    assert_eq!(backoff_for(2), Duration::from_millis(10));
    assert_eq!(backoff_for(3), Duration::from_millis(20));
    assert_eq!(backoff_for(10), Duration::from_millis(2560));
    // Far past the crossover the delay pins to the ceiling.
    assert_eq!(backoff_for(30), Duration::from_secs(1000));
    assert_eq!(backoff_for(63), Duration::from_secs(1000));
    assert_eq!(backoff_for(200), Duration::from_secs(1000));
}
