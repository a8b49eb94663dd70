use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

#[test]
fn test_of_then_applies_mapper_immediately() {
    let promise = Promise::of(21u32);
    let derived = promise.then(|v| v * 2);
    assert_eq!(derived.try_outcome(), Some(Ok(42)));
}

#[test]
fn test_resolve_twice_keeps_first_value() {
    let promise = Promise::pending();
    assert!(promise.resolve("first"));
    assert!(!promise.resolve("second"));
    assert_eq!(promise.try_outcome(), Some(Ok("first")));
}

#[test]
fn test_reject_after_resolve_is_noop() {
    let promise = Promise::pending();
    assert!(promise.resolve(7));
    assert!(!promise.reject(ClusterError::ConnectionLost));
    assert_eq!(promise.try_outcome(), Some(Ok(7)));
}

#[test]
fn test_continuation_deferred_until_resolution() {
    let promise: Promise<u32> = Promise::pending();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    promise.on_complete(move |outcome| {
        assert_eq!(*outcome, Ok(5));
        seen.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    promise.resolve(5);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Completion drained the continuation list; nothing fires again.
    assert!(!promise.resolve(6));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_continuations_run_in_registration_order() {
    let promise: Promise<u32> = Promise::pending();
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["a", "b", "c"] {
        let order = order.clone();
        promise.on_complete(move |_| order.lock().unwrap().push(tag));
    }
    promise.resolve(1);
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn test_rejection_skips_mapper() {
    let promise: Promise<u32> = Promise::pending();
    let mapped = Arc::new(AtomicUsize::new(0));
    let counter = mapped.clone();
    let derived = promise.then(move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        v + 1
    });

    promise.reject(ClusterError::ConnectionLost);

    assert_eq!(mapped.load(Ordering::SeqCst), 0);
    match derived.try_outcome() {
        Some(Err(ClusterError::ConnectionLost)) => {}
        other => panic!("expected ConnectionLost, got {other:?}"),
    }
}

#[test]
fn test_then_result_mapper_failure_rejects_derived() {
    let promise = Promise::of("Lobby-1".to_string());
    let derived: Promise<u32> = promise.then_result(|name| {
        Err(ClusterError::ServiceNotFound(name))
    });
    match derived.try_outcome() {
        Some(Err(ClusterError::ServiceNotFound(name))) => assert_eq!(name, "Lobby-1"),
        other => panic!("expected ServiceNotFound, got {other:?}"),
    }
}

#[test]
fn test_chained_then_propagates_through_derived() {
    let promise: Promise<u32> = Promise::pending();
    let derived = promise.then(|v| v + 1).then(|v| v * 10);
    promise.resolve(3);
    assert_eq!(derived.try_outcome(), Some(Ok(40)));
}

#[test]
fn test_continuation_registered_after_completion_runs_inline() {
    let promise = Promise::of(9);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    promise.on_complete(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_await_pending_promise() {
    let promise: Promise<String> = Promise::pending();
    let completer = promise.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        completer.resolve("done".to_string());
    });
    assert_eq!(promise.await, Ok("done".to_string()));
}

#[tokio::test]
async fn test_await_rejected_promise() {
    let promise: Promise<u32> = Promise::rejected(ClusterError::ConnectionLost);
    match promise.await {
        Err(ClusterError::ConnectionLost) => {}
        other => panic!("expected ConnectionLost, got {other:?}"),
    }
}
