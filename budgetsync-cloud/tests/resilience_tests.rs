use budgetsync_cloud::clock::ManualClock;
use budgetsync_cloud::config::{CircuitConfig, QueueConfig, ResilienceConfig, RetryPolicy};
use budgetsync_cloud::error::{StoreError, SyncError, SyncResult};
use budgetsync_cloud::resilience::{CircuitState, SyncResilience};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn config(max_attempts: u32, debounce_ms: u64) -> ResilienceConfig {
    ResilienceConfig {
        retry: RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        },
        circuit: CircuitConfig {
            failure_threshold: 3,
            cooldown_ms: 60_000,
        },
        queue: QueueConfig { debounce_ms },
    }
}

fn unavailable() -> SyncError {
    SyncError::Remote(StoreError::Unavailable("down".into()))
}

// --- Retry ---

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let layer = SyncResilience::new(&config(3, 0), Arc::new(ManualClock::new(0)));
    let calls = &AtomicUsize::new(0);

    let result = layer
        .execute("op", "op", || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err(unavailable()) } else { Ok(n) }
        })
        .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn validation_errors_are_not_retried() {
    let layer = SyncResilience::new(&config(5, 0), Arc::new(ManualClock::new(0)));
    let calls = &AtomicUsize::new(0);

    let result: SyncResult<()> = layer
        .execute("op", "op", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::Validation("bad manifest".into()))
        })
        .await;

    assert!(result.unwrap_err().is_validation());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(layer.circuit_state("op"), CircuitState::Closed);
}

#[tokio::test]
async fn exhausted_retries_surface_last_error() {
    let layer = SyncResilience::new(&config(4, 0), Arc::new(ManualClock::new(0)));
    let calls = &AtomicUsize::new(0);

    let result: SyncResult<()> = layer
        .execute("op", "op", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;

    assert!(matches!(result, Err(SyncError::Remote(StoreError::Unavailable(_)))));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

// --- Circuit breaker ---

#[tokio::test]
async fn circuit_opens_after_threshold_and_short_circuits() {
    let clock = ManualClock::new(0);
    let layer = SyncResilience::new(&config(1, 0), Arc::new(clock.clone()));
    let calls = &AtomicUsize::new(0);
    let failing = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(unavailable())
    };

    for _ in 0..3 {
        assert!(layer.execute("saveChunkBatch", "k", failing).await.is_err());
    }
    assert_eq!(layer.circuit_state("saveChunkBatch"), CircuitState::Open);

    let err = layer.execute("saveChunkBatch", "k", failing).await.unwrap_err();
    assert!(matches!(err, SyncError::CircuitOpen { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Other operations are unaffected.
    assert!(layer.execute("loadMainDocument", "k", || async { Ok(()) }).await.is_ok());
}

#[tokio::test]
async fn circuit_closes_after_cooldown_and_success() {
    let clock = ManualClock::new(0);
    let layer = SyncResilience::new(&config(1, 0), Arc::new(clock.clone()));

    for _ in 0..3 {
        let _ = layer
            .execute("op", "k", || async { Err::<(), _>(unavailable()) })
            .await;
    }
    clock.advance_millis(59_999);
    assert!(layer.execute("op", "k", || async { Ok(()) }).await.is_err());

    clock.advance_millis(1);
    layer.execute("op", "k", || async { Ok(()) }).await.unwrap();
    assert_eq!(layer.circuit_state("op"), CircuitState::Closed);
    assert_eq!(layer.stats().circuits["op"].consecutive_failures, 0);
}

#[tokio::test]
async fn success_resets_consecutive_failures() {
    let layer = SyncResilience::new(&config(1, 0), Arc::new(ManualClock::new(0)));
    for _ in 0..2 {
        let _ = layer
            .execute("op", "k", || async { Err::<(), _>(unavailable()) })
            .await;
    }
    layer.execute("op", "k", || async { Ok(()) }).await.unwrap();
    for _ in 0..2 {
        let _ = layer
            .execute("op", "k", || async { Err::<(), _>(unavailable()) })
            .await;
    }
    assert_eq!(layer.circuit_state("op"), CircuitState::Closed);
}

// --- Debounce queue ---

#[tokio::test(start_paused = true)]
async fn burst_on_one_key_runs_only_the_last_call() {
    let layer = SyncResilience::new(&config(1, 1500), Arc::new(ManualClock::new(0)));
    let calls = &AtomicUsize::new(0);
    let op = move |value: u32| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    };

    let (first, second) = tokio::join!(
        layer.execute("save", "save-1", op(1)),
        layer.execute("save", "save-1", op(2)),
    );

    assert!(matches!(first, Err(SyncError::Superseded { ref queue_key }) if queue_key == "save-1"));
    assert_eq!(second.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(layer.stats().pending_queue_keys, 0);
}

#[tokio::test(start_paused = true)]
async fn distinct_keys_do_not_supersede() {
    let layer = SyncResilience::new(&config(1, 1500), Arc::new(ManualClock::new(0)));

    let (a, b) = tokio::join!(
        layer.execute("save", "batch-0", || async { Ok(0) }),
        layer.execute("save", "batch-1", || async { Ok(1) }),
    );

    assert_eq!(a.unwrap(), 0);
    assert_eq!(b.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn calls_outside_the_window_both_run() {
    let layer = SyncResilience::new(&config(1, 1500), Arc::new(ManualClock::new(0)));
    assert_eq!(layer.execute("save", "k", || async { Ok(1) }).await.unwrap(), 1);
    assert_eq!(layer.execute("save", "k", || async { Ok(2) }).await.unwrap(), 2);
}
