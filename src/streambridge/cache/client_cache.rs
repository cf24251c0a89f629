use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::streambridge::client::{ClientDescriptor, ConnectionProvider};
use crate::streambridge::config::CacheConfig;

use super::clock::{Clock, SystemClock};
use super::error::CacheError;
use super::lease::Lease;

struct CacheEntry<H> {
    handle: Arc<H>,
    ref_count: AtomicUsize,
    /// Nanoseconds since the cache epoch at the last successful
    /// acquire/release.
    last_access: AtomicU64,
}

impl<H> CacheEntry<H> {
    fn touch(&self, now: u64) {
        self.last_access.store(now, Ordering::Release);
    }
}

/// Outcome of an in-flight construction, broadcast to every waiter.
#[derive(Clone)]
enum BuildState {
    InProgress,
    Ready,
    Failed(CacheError),
}

enum Slot<H> {
    /// Placeholder while the connection provider builds the handle. Holds a
    /// receiver so late arrivals can join the wait.
    Building(watch::Receiver<BuildState>),
    Ready(Arc<CacheEntry<H>>),
}

struct CacheState<H> {
    entries: HashMap<ClientDescriptor, Slot<H>>,
    closed: bool,
}

struct CacheShared<P: ConnectionProvider> {
    provider: P,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    epoch: Instant,
    state: Mutex<CacheState<P::Handle>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<P: ConnectionProvider> CacheShared<P> {
    fn elapsed_nanos(&self) -> u64 {
        self.clock
            .now()
            .saturating_duration_since(self.epoch)
            .as_nanos() as u64
    }
}

/// Concurrent cache of pooled client handles, keyed by [`ClientDescriptor`].
///
/// Cheap to clone; clones share the same entries. Must be created inside a
/// Tokio runtime (constructions and the idle sweep run as spawned tasks).
///
/// # Guarantees
///
/// - At most one live handle per unique descriptor.
/// - At most one in-flight construction per descriptor: callers racing on
///   the same descriptor suspend until the one construction resolves, and
///   all of them observe the same handle or the same failure.
/// - A handle is never closed while leased (`shutdown` excepted).
/// - Capacity is advisory: when every entry is in use, insertion proceeds
///   past `max_size` rather than blocking — soft on size, hard on identity.
pub struct ClientCache<P: ConnectionProvider> {
    shared: Arc<CacheShared<P>>,
}

impl<P: ConnectionProvider> Clone for ClientCache<P> {
    fn clone(&self) -> Self {
        ClientCache {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: ConnectionProvider> ClientCache<P> {
    pub fn new(provider: P, config: CacheConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    /// Creates a cache with an explicit time source.
    pub fn with_clock(provider: P, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let epoch = clock.now();
        let shared = Arc::new(CacheShared {
            provider,
            clock,
            config,
            epoch,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                closed: false,
            }),
            sweeper: Mutex::new(None),
        });
        let sweeper = spawn_sweeper(Arc::downgrade(&shared));
        *shared.sweeper.lock().unwrap() = Some(sweeper);
        ClientCache { shared }
    }

    /// Returns the pooled handle for the descriptor, constructing it through
    /// the connection provider on first use.
    ///
    /// Every successful acquire must be paired with exactly one
    /// [`release`](Self::release); prefer [`lease`](Self::lease), which
    /// releases on drop.
    pub async fn acquire(&self, descriptor: &ClientDescriptor) -> Result<Arc<P::Handle>, CacheError> {
        loop {
            let mut build_rx = {
                let mut state = self.shared.state.lock().unwrap();
                if state.closed {
                    return Err(CacheError::Closed);
                }
                match state.entries.get(descriptor) {
                    Some(Slot::Ready(entry)) => {
                        entry.ref_count.fetch_add(1, Ordering::AcqRel);
                        entry.touch(self.shared.elapsed_nanos());
                        debug!(
                            "Cache hit for destination '{}'",
                            descriptor.destination()
                        );
                        return Ok(Arc::clone(&entry.handle));
                    }
                    Some(Slot::Building(rx)) => rx.clone(),
                    None => {
                        let (tx, rx) = watch::channel(BuildState::InProgress);
                        state
                            .entries
                            .insert(descriptor.clone(), Slot::Building(rx.clone()));
                        // The construction is owned by the spawned task, not
                        // by this caller: cancelling any waiter leaves the
                        // build and the other waiters unaffected.
                        let shared = Arc::clone(&self.shared);
                        let build_descriptor = descriptor.clone();
                        tokio::spawn(async move {
                            run_construction(shared, build_descriptor, tx).await;
                        });
                        rx
                    }
                }
            };

            // Suspend outside the lock until the in-flight build resolves.
            loop {
                let snapshot = build_rx.borrow_and_update().clone();
                match snapshot {
                    BuildState::InProgress => {
                        if build_rx.changed().await.is_err() {
                            return Err(CacheError::ConstructionFailed(
                                "construction task terminated without a result".to_string(),
                            ));
                        }
                    }
                    BuildState::Ready => break,
                    BuildState::Failed(err) => return Err(err),
                }
            }
            // Ready: loop around to claim the entry. It may have been
            // evicted in the meantime, in which case a fresh build starts.
        }
    }

    /// Acquires a handle wrapped in an RAII [`Lease`] that releases on drop.
    pub async fn lease(&self, descriptor: &ClientDescriptor) -> Result<Lease<P>, CacheError> {
        let handle = self.acquire(descriptor).await?;
        Ok(Lease::new(self.clone(), descriptor.clone(), handle))
    }

    /// Returns a previously acquired handle to the pool.
    ///
    /// Fails with [`CacheError::InvariantViolation`] when the descriptor has
    /// no live entry or its reference count is already zero — both indicate
    /// a broken acquire/release pairing in the caller. After shutdown this
    /// is a no-op: the entries are already closed.
    pub fn release(&self, descriptor: &ClientDescriptor) -> Result<(), CacheError> {
        let state = self.shared.state.lock().unwrap();
        if state.closed {
            debug!(
                "Release after shutdown for destination '{}'",
                descriptor.destination()
            );
            return Ok(());
        }
        match state.entries.get(descriptor) {
            Some(Slot::Ready(entry)) => {
                let current = entry.ref_count.load(Ordering::Acquire);
                if current == 0 {
                    error!(
                        "Release without matching acquire for destination '{}'",
                        descriptor.destination()
                    );
                    return Err(CacheError::InvariantViolation(format!(
                        "release without matching acquire for '{}'",
                        descriptor.destination()
                    )));
                }
                entry.ref_count.store(current - 1, Ordering::Release);
                entry.touch(self.shared.elapsed_nanos());
                Ok(())
            }
            _ => {
                error!(
                    "Release for unknown client on destination '{}'",
                    descriptor.destination()
                );
                Err(CacheError::InvariantViolation(format!(
                    "release for unknown client on '{}'",
                    descriptor.destination()
                )))
            }
        }
    }

    /// Evicts every unreferenced entry idle longer than the configured
    /// timeout, closing the evicted handles. Returns how many were evicted.
    ///
    /// Runs periodically in the background; exposed for opportunistic
    /// cleanup and tests.
    pub async fn evict_idle(&self) -> usize {
        evict_idle(&self.shared).await
    }

    /// Number of cached entries, including in-flight constructions.
    pub fn len(&self) -> usize {
        self.shared.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every cached client regardless of reference count and rejects
    /// subsequent acquires with [`CacheError::Closed`]. Idempotent and safe
    /// to call concurrently with in-flight operations.
    pub async fn shutdown(&self) {
        let drained: Vec<(ClientDescriptor, Slot<P::Handle>)> = {
            let mut state = self.shared.state.lock().unwrap();
            if state.closed {
                return;
            }
            state.closed = true;
            state.entries.drain().collect()
        };
        if let Some(sweeper) = self.shared.sweeper.lock().unwrap().take() {
            sweeper.abort();
        }
        for (descriptor, slot) in drained {
            match slot {
                Slot::Ready(entry) => {
                    if entry.ref_count.load(Ordering::Acquire) > 0 {
                        warn!(
                            "Closing client for destination '{}' while still in use",
                            descriptor.destination()
                        );
                    }
                    close_handle(&self.shared, &entry.handle).await;
                }
                // In-flight builds observe the closed flag when they finish
                // and clean up their own handle.
                Slot::Building(_) => {}
            }
        }
        info!("Client cache shut down");
    }
}

/// Builds the handle for `descriptor` and publishes the outcome.
///
/// Runs as its own task so the construction survives waiter cancellation.
/// The cache lock is never held across the provider calls.
async fn run_construction<P: ConnectionProvider>(
    shared: Arc<CacheShared<P>>,
    descriptor: ClientDescriptor,
    tx: watch::Sender<BuildState>,
) {
    match shared.provider.construct(&descriptor).await {
        Ok(handle) => {
            let handle = Arc::new(handle);
            let published = {
                let mut state = shared.state.lock().unwrap();
                if state.closed {
                    None
                } else {
                    let evicted = evict_over_capacity(
                        &mut state.entries,
                        shared.config.max_size,
                        &descriptor,
                    );
                    let entry = Arc::new(CacheEntry {
                        handle: Arc::clone(&handle),
                        ref_count: AtomicUsize::new(0),
                        last_access: AtomicU64::new(shared.elapsed_nanos()),
                    });
                    state.entries.insert(descriptor.clone(), Slot::Ready(entry));
                    Some(evicted)
                }
            };
            match published {
                Some(evicted) => {
                    info!(
                        "Created client for destination '{}'",
                        descriptor.destination()
                    );
                    let _ = tx.send(BuildState::Ready);
                    for (victim, entry) in evicted {
                        debug!(
                            "Evicted client for destination '{}' over capacity",
                            victim.destination()
                        );
                        close_handle(&shared, &entry.handle).await;
                    }
                }
                None => {
                    // Shutdown raced the build: the placeholder is already
                    // drained, only the fresh handle needs closing.
                    close_handle(&shared, &handle).await;
                    let _ = tx.send(BuildState::Failed(CacheError::Closed));
                }
            }
        }
        Err(err) => {
            {
                let mut state = shared.state.lock().unwrap();
                state.entries.remove(&descriptor);
            }
            warn!(
                "Failed to construct client for destination '{}': {}",
                descriptor.destination(),
                err
            );
            let _ = tx.send(BuildState::Failed(CacheError::ConstructionFailed(
                err.to_string(),
            )));
        }
    }
}

/// Removes least-recently-used unreferenced entries until the map fits the
/// capacity, never touching `incoming`. Returns the removed entries for the
/// caller to close outside the lock.
fn evict_over_capacity<H>(
    entries: &mut HashMap<ClientDescriptor, Slot<H>>,
    max_size: usize,
    incoming: &ClientDescriptor,
) -> Vec<(ClientDescriptor, Arc<CacheEntry<H>>)> {
    let mut evicted = Vec::new();
    while entries.len() > max_size {
        let lru = entries
            .iter()
            .filter_map(|(descriptor, slot)| match slot {
                Slot::Ready(entry)
                    if descriptor != incoming
                        && entry.ref_count.load(Ordering::Acquire) == 0 =>
                {
                    Some((descriptor.clone(), entry.last_access.load(Ordering::Acquire)))
                }
                _ => None,
            })
            .min_by_key(|(_, last_access)| *last_access)
            .map(|(descriptor, _)| descriptor);
        match lru {
            Some(descriptor) => {
                if let Some(Slot::Ready(entry)) = entries.remove(&descriptor) {
                    evicted.push((descriptor, entry));
                }
            }
            // Everything is referenced or still building: advisory capacity,
            // the insertion proceeds over the limit.
            None => break,
        }
    }
    evicted
}

async fn evict_idle<P: ConnectionProvider>(shared: &CacheShared<P>) -> usize {
    let now = shared.elapsed_nanos();
    let idle_nanos = shared.config.idle_timeout.as_nanos() as u64;
    let expired: Vec<(ClientDescriptor, Arc<CacheEntry<P::Handle>>)> = {
        let mut state = shared.state.lock().unwrap();
        if state.closed {
            return 0;
        }
        let victims: Vec<ClientDescriptor> = state
            .entries
            .iter()
            .filter_map(|(descriptor, slot)| match slot {
                Slot::Ready(entry)
                    if entry.ref_count.load(Ordering::Acquire) == 0
                        && now.saturating_sub(entry.last_access.load(Ordering::Acquire))
                            > idle_nanos =>
                {
                    Some(descriptor.clone())
                }
                _ => None,
            })
            .collect();
        victims
            .into_iter()
            .filter_map(|descriptor| match state.entries.remove(&descriptor) {
                Some(Slot::Ready(entry)) => Some((descriptor, entry)),
                _ => None,
            })
            .collect()
    };
    let count = expired.len();
    for (descriptor, entry) in expired {
        debug!(
            "Evicting idle client for destination '{}'",
            descriptor.destination()
        );
        close_handle(shared, &entry.handle).await;
    }
    count
}

/// Close failures are logged and swallowed: a leaked broker-side resource is
/// preferable to a cache entry that can never be removed.
async fn close_handle<P: ConnectionProvider>(shared: &CacheShared<P>, handle: &P::Handle) {
    if let Err(err) = shared.provider.close(handle).await {
        warn!("Failed to close client: {}", err);
    }
}

fn spawn_sweeper<P: ConnectionProvider>(shared: Weak<CacheShared<P>>) -> JoinHandle<()> {
    let interval = match shared.upgrade() {
        Some(shared) => shared.config.eviction_interval,
        None => return tokio::spawn(async {}),
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick resolves immediately; skip it so a freshly created
        // cache is not swept at time zero.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(shared) = shared.upgrade() else {
                break;
            };
            if shared.state.lock().unwrap().closed {
                break;
            }
            evict_idle(&shared).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streambridge::schema::EncodingStrategy;
    use crate::streambridge::testing::{ManualClock, RecordingProvider};
    use std::time::Duration;

    fn descriptor(destination: &str) -> ClientDescriptor {
        ClientDescriptor::new(destination, EncodingStrategy::Bytes)
    }

    #[tokio::test]
    async fn test_hit_returns_pooled_handle_without_rebuilding() {
        let provider = RecordingProvider::new();
        let cache = ClientCache::new(provider.clone(), CacheConfig::default());

        let first = cache.acquire(&descriptor("orders")).await.unwrap();
        let second = cache.acquire(&descriptor("orders")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second), "Expected the pooled handle");
        assert_eq!(provider.construct_count(), 1);
        cache.release(&descriptor("orders")).unwrap();
        cache.release(&descriptor("orders")).unwrap();
    }

    #[tokio::test]
    async fn test_distinct_descriptors_get_distinct_handles() {
        let provider = RecordingProvider::new();
        let cache = ClientCache::new(provider.clone(), CacheConfig::default());

        let orders = cache.acquire(&descriptor("orders")).await.unwrap();
        let invoices = cache.acquire(&descriptor("invoices")).await.unwrap();

        assert!(!Arc::ptr_eq(&orders, &invoices));
        assert_eq!(provider.construct_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_release_below_zero_is_an_invariant_violation() {
        let provider = RecordingProvider::new();
        let cache = ClientCache::new(provider, CacheConfig::default());

        cache.acquire(&descriptor("orders")).await.unwrap();
        cache.release(&descriptor("orders")).unwrap();

        let result = cache.release(&descriptor("orders"));
        assert!(matches!(result, Err(CacheError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn test_release_of_unknown_descriptor_is_an_invariant_violation() {
        let provider = RecordingProvider::new();
        let cache: ClientCache<RecordingProvider> =
            ClientCache::new(provider, CacheConfig::default());
        let result = cache.release(&descriptor("never-acquired"));
        assert!(matches!(result, Err(CacheError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn test_acquire_after_shutdown_fails_closed() {
        let provider = RecordingProvider::new();
        let cache = ClientCache::new(provider, CacheConfig::default());
        cache.shutdown().await;
        cache.shutdown().await; // idempotent

        let result = cache.acquire(&descriptor("orders")).await;
        assert_eq!(result.unwrap_err(), CacheError::Closed);
    }

    #[tokio::test]
    async fn test_failed_construction_rolls_back_the_placeholder() {
        let clock = Arc::new(ManualClock::new());
        let provider = RecordingProvider::new().fail_with("broker unavailable");
        let cache = ClientCache::with_clock(
            provider.clone(),
            CacheConfig::default().idle_timeout(Duration::from_secs(60)),
            clock,
        );

        let result = cache.acquire(&descriptor("orders")).await;
        assert!(matches!(result, Err(CacheError::ConstructionFailed(_))));
        // Rolled back: nothing cached, a later acquire starts a fresh build.
        assert!(cache.is_empty());
        assert_eq!(provider.construct_count(), 1);
    }
}
