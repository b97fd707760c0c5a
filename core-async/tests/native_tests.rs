//! Integration tests for core-async on the Tokio runtime.

use core_async::{sync, task, time, YieldBudget};
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[tokio::test]
async fn test_task_spawn_blocking() {
    let handle = task::spawn_blocking(|| {
        std::thread::sleep(std::time::Duration::from_millis(10));
        100
    });
    let result = handle.await.unwrap();
    assert_eq!(result, 100);
}

#[tokio::test]
async fn test_sleep() {
    let start = time::Instant::now();
    time::sleep(time::Duration::from_millis(50)).await;
    assert!(start.elapsed() >= time::Duration::from_millis(50));
}

#[tokio::test]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(200)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_cancellation_token_propagates_to_children() {
    let token = sync::CancellationToken::new();
    let child = token.child_token();
    assert!(!child.is_cancelled());

    token.cancel();
    assert!(child.is_cancelled());
    child.cancelled().await;
}

#[tokio::test]
async fn test_unbounded_channel_preserves_order() {
    let (tx, mut rx) = sync::mpsc::unbounded_channel();
    for i in 0..10 {
        tx.send(i).unwrap();
    }
    drop(tx);

    let mut received = Vec::new();
    while let Some(value) = rx.recv().await {
        received.push(value);
    }
    assert_eq!(received, (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_yield_budget_lets_other_tasks_run() {
    let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let observer = {
        let counter = Arc::clone(&counter);
        task::spawn(async move {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
    };

    let mut budget = YieldBudget::new(time::Duration::ZERO);
    for _ in 0..16 {
        budget.tick().await;
    }

    observer.await.unwrap();
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(budget.yields(), 16);
}
