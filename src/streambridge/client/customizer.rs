use std::collections::HashMap;

/// Construction parameters a customizer may adjust before a client handle is
/// built. The connection provider consumes the final settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSettings {
    properties: HashMap<String, String>,
}

impl ClientSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}

/// A named adjustment to client construction parameters.
///
/// Customizers participate in the client cache key through their
/// [`identity`](ClientCustomizer::identity): two customizers with the same
/// identity are interchangeable for caching purposes, so the identity string
/// must capture every piece of state that affects [`customize`]. Anonymous
/// closures cannot implement this trait; a customizer is always an explicit,
/// named object with a comparable identity.
///
/// Customizers are applied in sequence and may be non-commutative (one may
/// disable batching, a later one may depend on the batching state), so the
/// sequence order is part of the cache key as well.
///
/// [`customize`]: ClientCustomizer::customize
pub trait ClientCustomizer: Send + Sync {
    /// Stable identity of this customizer, covering all state that affects
    /// `customize`.
    fn identity(&self) -> &str;

    /// Adjusts the settings a client will be constructed with.
    fn customize(&self, settings: &mut ClientSettings);
}

/// Customizer that sets a single construction property.
///
/// The identity is derived from the key and value, so two instances carrying
/// the same pair compare equal in a descriptor.
#[derive(Debug, Clone)]
pub struct PropertyCustomizer {
    identity: String,
    key: String,
    value: String,
}

impl PropertyCustomizer {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        PropertyCustomizer {
            identity: format!("property:{}={}", key, value),
            key,
            value,
        }
    }
}

impl ClientCustomizer for PropertyCustomizer {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn customize(&self, settings: &mut ClientSettings) {
        settings.set(self.key.clone(), self.value.clone());
    }
}
