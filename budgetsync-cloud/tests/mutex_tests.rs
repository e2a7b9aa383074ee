use budgetsync_cloud::mutex::SyncMutex;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn concurrent_operations_never_interleave() {
    let mutex = SyncMutex::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mutex = &mutex;
    let ops = (0..4).map(|n| {
        let log = log.clone();
        async move {
            mutex
                .execute(&format!("op-{n}"), || async move {
                    log.lock().unwrap().push(format!("start-{n}"));
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    tokio::task::yield_now().await;
                    log.lock().unwrap().push(format!("end-{n}"));
                    n
                })
                .await
        }
    });
    let results = join_all(ops).await;

    assert_eq!(results, vec![0, 1, 2, 3]);
    let expected: Vec<String> = (0..4)
        .flat_map(|n| [format!("start-{n}"), format!("end-{n}")])
        .collect();
    assert_eq!(*log.lock().unwrap(), expected);
}

#[tokio::test]
async fn failure_only_rejects_its_own_caller() {
    let mutex = SyncMutex::new();

    let (first, second) = tokio::join!(
        mutex.execute("failing", || async { Err::<u32, &str>("boom") }),
        mutex.execute("healthy", || async { Ok::<u32, &str>(7) }),
    );

    assert_eq!(first, Err("boom"));
    assert_eq!(second, Ok(7));
    assert!(!mutex.is_locked());
}

#[tokio::test]
async fn stats_track_contention() {
    let mutex = SyncMutex::new();

    let (_, _) = tokio::join!(
        mutex.execute("a", || tokio::time::sleep(Duration::from_millis(5))),
        mutex.execute("b", || async {}),
    );

    let stats = mutex.stats();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.contended, 1);
    assert_eq!(stats.waiting, 0);
    assert_eq!(stats.active, None);
}

#[tokio::test]
async fn active_label_is_visible_while_running() {
    let mutex = &SyncMutex::new();
    let seen = mutex
        .execute("loadFromCloud", || async move { mutex.stats().active })
        .await;
    assert_eq!(seen.as_deref(), Some("loadFromCloud"));
}
