//! Configuration surfaces for the cache and the client factory.
//!
//! The core consumes already-parsed values only; reading these from files or
//! environment belongs to the embedding application.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::streambridge::client::ClientCustomizer;
use crate::streambridge::schema::MessageType;

/// Configuration for the client cache with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached clients. Advisory: when every entry is in
    /// use the cache grows past this rather than blocking callers.
    pub max_size: usize,
    /// How long an unreferenced client may sit idle before eviction.
    pub idle_timeout: Duration,
    /// How often the background sweep looks for idle clients.
    pub eviction_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            idle_timeout: Duration::from_secs(60),
            eviction_interval: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum cache size
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the idle eviction timeout
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Set the background sweep interval
    pub fn eviction_interval(mut self, eviction_interval: Duration) -> Self {
        self.eviction_interval = eviction_interval;
        self
    }
}

/// Configuration for the client factory.
#[derive(Clone, Default)]
pub struct BridgeConfig {
    /// Destination used when neither the call nor the message type supplies
    /// one.
    pub default_destination: Option<String>,
    /// Per-message-type destination defaults, consulted by the fluent
    /// send/consume API before the process-wide default.
    pub type_destinations: HashMap<MessageType, String>,
    /// Customizers applied to every client, before any per-call customizers.
    pub default_customizers: Vec<Arc<dyn ClientCustomizer>>,
    /// Cache settings shared by the producer and consumer caches.
    pub cache: CacheConfig,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the process-wide default destination
    pub fn default_destination(mut self, destination: impl Into<String>) -> Self {
        self.default_destination = Some(destination.into());
        self
    }

    /// Map a message type to its default destination
    pub fn type_destination<T: 'static>(mut self, destination: impl Into<String>) -> Self {
        self.type_destinations
            .insert(MessageType::of::<T>(), destination.into());
        self
    }

    /// Append a process-wide default customizer
    pub fn default_customizer(mut self, customizer: Arc<dyn ClientCustomizer>) -> Self {
        self.default_customizers.push(customizer);
        self
    }

    /// Set the cache configuration
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let customizers: Vec<&str> = self
            .default_customizers
            .iter()
            .map(|c| c.identity())
            .collect();
        f.debug_struct("BridgeConfig")
            .field("default_destination", &self.default_destination)
            .field("type_destinations", &self.type_destinations)
            .field("default_customizers", &customizers)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streambridge::client::PropertyCustomizer;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_builder_chains() {
        let config = BridgeConfig::new()
            .default_destination("events")
            .type_destination::<String>("strings")
            .default_customizer(Arc::new(PropertyCustomizer::new("linger.ms", "5")))
            .cache(CacheConfig::new().max_size(8));
        assert_eq!(config.default_destination.as_deref(), Some("events"));
        assert_eq!(
            config.type_destinations.get(&MessageType::of::<String>()),
            Some(&"strings".to_string())
        );
        assert_eq!(config.default_customizers.len(), 1);
        assert_eq!(config.cache.max_size, 8);
    }
}
