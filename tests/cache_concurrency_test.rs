//! Concurrency properties of the client cache: one construction per
//! descriptor no matter how many callers race, shared failure delivery, and
//! waiter-cancellation safety.

use std::sync::Arc;
use std::time::Duration;

use streambridge::testing::RecordingProvider;
use streambridge::{CacheConfig, CacheError, ClientCache, ClientDescriptor, EncodingStrategy};
use tokio::sync::Barrier;

fn descriptor(destination: &str) -> ClientDescriptor {
    ClientDescriptor::new(destination, EncodingStrategy::Bytes)
}

#[tokio::test]
async fn test_concurrent_acquires_construct_exactly_once() {
    const CALLERS: usize = 16;

    let provider = RecordingProvider::new().construct_delay(Duration::from_millis(50));
    let cache = Arc::new(ClientCache::new(provider.clone(), CacheConfig::default()));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let mut tasks = Vec::new();
    for _ in 0..CALLERS {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            cache.acquire(&descriptor("orders")).await
        }));
    }

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().expect("acquire failed"));
    }

    assert_eq!(
        provider.construct_count(),
        1,
        "Racing callers must share one construction"
    );
    let first = &handles[0];
    for handle in &handles[1..] {
        assert!(Arc::ptr_eq(first, handle), "All callers share one handle");
    }
    assert_eq!(cache.len(), 1);

    for _ in 0..CALLERS {
        cache.release(&descriptor("orders")).unwrap();
    }
    // One more release than acquires is a caller bug.
    let underflow = cache.release(&descriptor("orders"));
    assert!(matches!(
        underflow,
        Err(CacheError::InvariantViolation(_))
    ));
}

#[tokio::test]
async fn test_all_waiters_observe_the_same_failure() {
    const CALLERS: usize = 8;

    let provider = RecordingProvider::new()
        .construct_delay(Duration::from_millis(50))
        .fail_with("broker handshake refused");
    let cache = Arc::new(ClientCache::new(provider.clone(), CacheConfig::default()));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let mut tasks = Vec::new();
    for _ in 0..CALLERS {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            cache.acquire(&descriptor("orders")).await
        }));
    }

    for task in tasks {
        let result = task.await.unwrap();
        match result {
            Err(CacheError::ConstructionFailed(message)) => {
                assert!(message.contains("broker handshake refused"));
            }
            other => panic!("expected ConstructionFailed, got {:?}", other),
        }
    }
    assert_eq!(provider.construct_count(), 1);
    assert!(cache.is_empty(), "Failed placeholder must be rolled back");

    // The failure is not sticky: the next acquire starts a fresh build.
    provider.clear_failure();
    cache.acquire(&descriptor("orders")).await.unwrap();
    assert_eq!(provider.construct_count(), 2);
    cache.release(&descriptor("orders")).unwrap();
}

#[tokio::test]
async fn test_cancelled_waiter_leaves_construction_and_other_waiters_intact() {
    let provider = RecordingProvider::new().construct_delay(Duration::from_millis(100));
    let cache = Arc::new(ClientCache::new(provider.clone(), CacheConfig::default()));

    // First caller kicks off the construction, then gets cancelled mid-wait.
    let initiator = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.acquire(&descriptor("orders")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.acquire(&descriptor("orders")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    initiator.abort();
    assert!(initiator.await.unwrap_err().is_cancelled());

    let handle = waiter
        .await
        .unwrap()
        .expect("surviving waiter must still get the handle");
    assert_eq!(provider.construct_count(), 1);
    drop(handle);
    cache.release(&descriptor("orders")).unwrap();
}

#[tokio::test]
async fn test_shutdown_during_construction_fails_waiters_and_closes_the_fresh_handle() {
    let provider = RecordingProvider::new().construct_delay(Duration::from_millis(80));
    let cache = Arc::new(ClientCache::new(provider.clone(), CacheConfig::default()));

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.acquire(&descriptor("orders")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.shutdown().await;

    let result = waiter.await.unwrap();
    assert_eq!(result.unwrap_err(), CacheError::Closed);

    // The build finishes after shutdown and must clean up its own handle.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(provider.construct_count(), 1);
    assert_eq!(provider.close_count(), 1);
}
