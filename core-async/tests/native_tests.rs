//! Integration tests for core-async.
//!
//! These exercise the primitives the bridge crates build on: spawning with
//! outcome classification, optionally bounded waits, and the latch.

use core_async::sync::{self, latch};
use core_async::task::{self, TaskOutcome};
use core_async::time;
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}

#[tokio::test]
async fn test_join_classifies_error_result_as_completed() {
    let handle = task::spawn(async { Err::<(), _>("engine returned") });
    match task::join(handle).await {
        TaskOutcome::Completed(Err(message)) => assert_eq!(message, "engine returned"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(200)).await;
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_bounded_none_behaves_like_plain_await() {
    let result = time::bounded(None, async { "ok" }).await;
    assert_eq!(result.unwrap(), "ok");
}

#[tokio::test]
async fn test_latch_across_tasks() {
    let (setter, ready) = latch::<Arc<Vec<&'static str>>>();

    let observer = ready.clone();
    let waiter = task::spawn(async move { observer.wait().await.len() });

    task::spawn(async move {
        time::sleep(time::Duration::from_millis(5)).await;
        setter.set(Arc::new(vec!["convert", "play"]));
    });

    assert_eq!(waiter.await.unwrap(), 2);
    assert_eq!(ready.try_get().map(|v| v.len()), Some(2));
}

#[tokio::test]
async fn test_latch_race_with_watch_signal() {
    // The bridge races a latch against a supervisor watch channel.
    let (_setter, ready) = latch::<u8>();
    let (exit_tx, mut exit_rx) = sync::watch::channel(false);

    task::spawn(async move {
        exit_tx.send(true).ok();
    });

    let exited = tokio::select! {
        _ = ready.wait() => false,
        changed = exit_rx.wait_for(|exited| *exited) => changed.is_ok(),
    };

    assert!(exited);
}

#[tokio::test]
async fn test_mutex_hands_over_in_request_order() {
    let gate = Arc::new(sync::Mutex::new(Vec::new()));
    let held = gate.lock().await;

    let mut waiters = Vec::new();
    for i in 0..5 {
        let gate = Arc::clone(&gate);
        waiters.push(task::spawn(async move {
            gate.lock().await.push(i);
        }));
        // Let the waiter queue up before spawning the next one.
        task::yield_now().await;
    }

    drop(held);
    for waiter in waiters {
        waiter.await.unwrap();
    }

    assert_eq!(*gate.lock().await, vec![0, 1, 2, 3, 4]);
}
