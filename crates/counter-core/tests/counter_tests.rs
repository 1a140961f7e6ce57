use counter_core::testing::{FakeAtomicStore, FakeDurableStore};
use counter_core::{Counter, CounterConfig};
use std::time::Duration;

fn fast_config() -> CounterConfig {
    CounterConfig {
        probe_interval: Duration::from_millis(20),
        health_hysteresis: 2,
        batch_size: 10,
        flush_interval: Duration::from_millis(30),
        ..CounterConfig::default()
    }
}

/// Spec §8 scenario 1: 100 concurrent increments of delta 1 converge to
/// 100, and the durable tier observes far fewer than 100 row updates
/// thanks to batch coalescing.
#[tokio::test]
async fn batched_concurrent_increments_coalesce() {
    let atomic = FakeAtomicStore::new();
    let durable = FakeDurableStore::new();
    let counter = Counter::new(atomic, durable.clone(), fast_config());

    let mut handles = Vec::new();
    for _ in 0..100 {
        let counter = counter.clone();
        handles.push(tokio::spawn(async move {
            counter.increment("online_players", 1, None).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(counter.get_value("online_players").await.unwrap(), 100);

    // Let the batcher's age-based flush drain the final partial batch.
    tokio::time::sleep(Duration::from_millis(100)).await;
    counter.shutdown().await;

    assert!(
        durable.batch_upsert_calls() <= 10,
        "expected batching to keep durable writes low, got {}",
        durable.batch_upsert_calls()
    );
}

/// Spec §8 scenario 2: repeating an actor's contribution within the day
/// does not double-count.
#[tokio::test]
async fn uniqueness_dedups_same_actor() {
    let atomic = FakeAtomicStore::new();
    let durable = FakeDurableStore::new();
    let counter = Counter::new(atomic, durable, fast_config());

    let first = counter.increment("dau", 1, Some("u1")).await.unwrap();
    let repeat = counter.increment("dau", 1, Some("u1")).await.unwrap();
    counter.increment("dau", 1, Some("u2")).await.unwrap();

    assert!(!first.deduped);
    assert!(repeat.deduped, "repeated actor on the same day should be reported as deduped");
    assert_eq!(repeat.value, first.value, "deduped call must not change the counter value");
    assert_eq!(counter.get_value("dau").await.unwrap(), 2);
    counter.shutdown().await;
}

/// Spec §8 scenario 3: the fast tier going down routes writes through
/// the durable tier and the write queue; once it recovers, the value is
/// visible again from the (now-replayed) fast tier.
#[tokio::test]
async fn degradation_then_recovery_replays_queue() {
    let atomic = FakeAtomicStore::new();
    let durable = FakeDurableStore::new();
    let counter = Counter::new(atomic.clone(), durable.clone(), fast_config());

    atomic.set_unreachable(true);
    // Let the health gate observe the outage (two consecutive failures).
    tokio::time::sleep(Duration::from_millis(60)).await;

    let outcome = counter.increment("score", 5, None).await.unwrap();
    assert!(outcome.degraded, "increment should report degraded side-channel");
    assert_eq!(outcome.value, 5);
    assert_eq!(durable.value_of("score"), 5);

    atomic.set_unreachable(false);
    // Two probe intervals to clear, plus slack for the recovery worker.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!counter.is_degraded());
    assert_eq!(counter.get_value("score").await.unwrap(), 5);
    counter.shutdown().await;
}

/// Spec §8 boundary behaviour: decrementing past zero clamps instead of
/// going negative.
#[tokio::test]
async fn decrement_clamps_at_zero() {
    let atomic = FakeAtomicStore::new();
    let durable = FakeDurableStore::new();
    let counter = Counter::new(atomic, durable, fast_config());

    counter.increment("lives", 5, None).await.unwrap();
    let outcome = counter.decrement("lives", 6).await.unwrap();

    assert_eq!(outcome.value, 0);
    counter.shutdown().await;
}

/// Reset → Increment(d) round trip (spec §8).
#[tokio::test]
async fn reset_then_increment_equals_delta() {
    let atomic = FakeAtomicStore::new();
    let durable = FakeDurableStore::new();
    let counter = Counter::new(atomic, durable, fast_config());

    counter.increment("events", 41, None).await.unwrap();
    counter.reset("events").await.unwrap();
    let outcome = counter.increment("events", 7, None).await.unwrap();

    assert_eq!(outcome.value, 7);
    counter.shutdown().await;
}

/// Unknown counters default to zero rather than erroring.
#[tokio::test]
async fn unknown_counter_defaults_to_zero() {
    let atomic = FakeAtomicStore::new();
    let durable = FakeDurableStore::new();
    let counter = Counter::new(atomic, durable, fast_config());

    assert_eq!(counter.get_value("never_touched").await.unwrap(), 0);

    let multi = counter
        .get_multiple(&["never_touched".to_string(), "also_missing".to_string()])
        .await
        .unwrap();
    assert_eq!(multi["never_touched"], 0);
    assert_eq!(multi["also_missing"], 0);
    counter.shutdown().await;
}
