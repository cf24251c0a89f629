//! Shutdown semantics: everything closes, even handles still in use, and
//! the cache stays permanently closed.

use std::sync::Arc;

use streambridge::testing::RecordingProvider;
use streambridge::{CacheConfig, CacheError, ClientCache, ClientDescriptor, EncodingStrategy};

fn descriptor(destination: &str) -> ClientDescriptor {
    ClientDescriptor::new(destination, EncodingStrategy::Bytes)
}

#[tokio::test]
async fn test_shutdown_closes_handles_still_in_use() {
    let provider = RecordingProvider::new();
    let cache = ClientCache::new(provider.clone(), CacheConfig::default());

    let held = cache.acquire(&descriptor("orders")).await.unwrap();
    cache.shutdown().await;

    assert!(held.is_closed(), "Shutdown closes regardless of ref count");
    assert_eq!(provider.close_count(), 1);

    let result = cache.acquire(&descriptor("orders")).await;
    assert_eq!(result.unwrap_err(), CacheError::Closed);

    // Releasing after shutdown is a no-op, not a caller bug.
    assert!(cache.release(&descriptor("orders")).is_ok());
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_safe_concurrently() {
    let provider = RecordingProvider::new();
    let cache = Arc::new(ClientCache::new(provider.clone(), CacheConfig::default()));

    cache.acquire(&descriptor("a")).await.unwrap();
    cache.release(&descriptor("a")).unwrap();
    cache.acquire(&descriptor("b")).await.unwrap();
    cache.release(&descriptor("b")).unwrap();

    let first = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.shutdown().await })
    };
    let second = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.shutdown().await })
    };
    first.await.unwrap();
    second.await.unwrap();
    cache.shutdown().await;

    assert_eq!(provider.close_count(), 2, "Each entry closes exactly once");
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_lease_drop_after_shutdown_is_quiet() {
    let provider = RecordingProvider::new();
    let cache = ClientCache::new(provider.clone(), CacheConfig::default());

    let lease = cache.lease(&descriptor("orders")).await.unwrap();
    cache.shutdown().await;
    // The lease outlived the cache entries; dropping it must not panic or
    // surface an invariant violation.
    drop(lease);
    assert_eq!(provider.close_count(), 1);
}
