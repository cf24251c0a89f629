//! Eviction behavior: LRU ordering under capacity pressure, idle timeouts
//! driven by a manual clock, and the advisory capacity limit.

use std::sync::Arc;
use std::time::Duration;

use streambridge::testing::{ManualClock, RecordingProvider};
use streambridge::{CacheConfig, ClientCache, ClientDescriptor, EncodingStrategy};

fn descriptor(destination: &str) -> ClientDescriptor {
    ClientDescriptor::new(destination, EncodingStrategy::Bytes)
}

fn cache_with_clock(
    provider: &RecordingProvider,
    config: CacheConfig,
) -> (ClientCache<RecordingProvider>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = ClientCache::with_clock(provider.clone(), config, clock.clone());
    (cache, clock)
}

#[tokio::test]
async fn test_capacity_evicts_least_recently_used_first() {
    let provider = RecordingProvider::new();
    let (cache, clock) = cache_with_clock(&provider, CacheConfig::default().max_size(2));

    // Three distinct descriptors, each fully released, with distinct
    // access times.
    cache.acquire(&descriptor("d1")).await.unwrap();
    cache.release(&descriptor("d1")).unwrap();
    clock.advance(Duration::from_secs(1));

    cache.acquire(&descriptor("d2")).await.unwrap();
    cache.release(&descriptor("d2")).unwrap();
    clock.advance(Duration::from_secs(1));

    cache.acquire(&descriptor("d3")).await.unwrap();
    cache.release(&descriptor("d3")).unwrap();

    assert_eq!(cache.len(), 2, "Capacity 2 must hold after a 3rd insert");
    // The evicted handle closes in the background; give it a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(provider.close_count(), 1);

    // d2 must still be pooled; d1 was the least recently used.
    cache.acquire(&descriptor("d2")).await.unwrap();
    cache.release(&descriptor("d2")).unwrap();
    assert_eq!(provider.construct_count(), 3);

    cache.acquire(&descriptor("d1")).await.unwrap();
    assert_eq!(
        provider.construct_count(),
        4,
        "The evicted d1 needs a fresh construction"
    );
    cache.release(&descriptor("d1")).unwrap();
}

#[tokio::test]
async fn test_referenced_entries_are_never_evicted() {
    let provider = RecordingProvider::new();
    let (cache, clock) = cache_with_clock(
        &provider,
        CacheConfig::default()
            .max_size(1)
            .idle_timeout(Duration::from_secs(60)),
    );

    let held = cache.acquire(&descriptor("held")).await.unwrap();

    // Over capacity, but the only other entry is referenced: the insert
    // proceeds past the limit instead of blocking or evicting it.
    cache.acquire(&descriptor("second")).await.unwrap();
    assert_eq!(cache.len(), 2, "Advisory capacity never blocks callers");
    assert_eq!(provider.close_count(), 0);

    // Idle for far longer than the timeout: still no eviction while held.
    clock.advance(Duration::from_secs(3600));
    assert_eq!(cache.evict_idle().await, 0);
    assert_eq!(cache.len(), 2);

    // Released entries become evictable again.
    cache.release(&descriptor("held")).unwrap();
    cache.release(&descriptor("second")).unwrap();
    clock.advance(Duration::from_secs(3600));
    assert_eq!(cache.evict_idle().await, 2);
    assert!(cache.is_empty());
    drop(held);
}

#[tokio::test]
async fn test_idle_eviction_closes_and_a_later_acquire_rebuilds() {
    let provider = RecordingProvider::new();
    let (cache, clock) = cache_with_clock(
        &provider,
        CacheConfig::default().idle_timeout(Duration::from_secs(60)),
    );

    cache.acquire(&descriptor("orders")).await.unwrap();
    cache.release(&descriptor("orders")).unwrap();

    clock.advance(Duration::from_secs(61));
    assert_eq!(cache.evict_idle().await, 1);
    assert_eq!(provider.close_count(), 1);

    cache.acquire(&descriptor("orders")).await.unwrap();
    assert_eq!(
        provider.construct_count(),
        2,
        "The old handle was closed, a new one must be built"
    );
    cache.release(&descriptor("orders")).unwrap();
}

#[tokio::test]
async fn test_reacquire_before_timeout_reuses_the_pooled_handle() {
    let provider = RecordingProvider::new();
    let (cache, clock) = cache_with_clock(
        &provider,
        CacheConfig::default().idle_timeout(Duration::from_secs(60)),
    );

    let first = cache.acquire(&descriptor("orders")).await.unwrap();
    cache.release(&descriptor("orders")).unwrap();

    clock.advance(Duration::from_secs(10));
    assert_eq!(cache.evict_idle().await, 0);

    let second = cache.acquire(&descriptor("orders")).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.construct_count(), 1);
    cache.release(&descriptor("orders")).unwrap();
}

#[tokio::test]
async fn test_release_refreshes_the_idle_clock() {
    let provider = RecordingProvider::new();
    let (cache, clock) = cache_with_clock(
        &provider,
        CacheConfig::default().idle_timeout(Duration::from_secs(60)),
    );

    cache.acquire(&descriptor("orders")).await.unwrap();
    clock.advance(Duration::from_secs(100));
    cache.release(&descriptor("orders")).unwrap();

    // Idle time counts from the release, not the acquire.
    clock.advance(Duration::from_secs(30));
    assert_eq!(cache.evict_idle().await, 0);

    clock.advance(Duration::from_secs(31));
    assert_eq!(cache.evict_idle().await, 1);
}

#[tokio::test]
async fn test_close_failure_still_removes_the_entry() {
    let provider = RecordingProvider::new().fail_closes();
    let (cache, clock) = cache_with_clock(
        &provider,
        CacheConfig::default().idle_timeout(Duration::from_secs(60)),
    );

    cache.acquire(&descriptor("orders")).await.unwrap();
    cache.release(&descriptor("orders")).unwrap();
    clock.advance(Duration::from_secs(61));

    // The close fails, but the entry must be gone regardless.
    assert_eq!(cache.evict_idle().await, 1);
    assert!(cache.is_empty());

    cache.acquire(&descriptor("orders")).await.unwrap();
    assert_eq!(provider.construct_count(), 2);
    cache.release(&descriptor("orders")).unwrap();
}
