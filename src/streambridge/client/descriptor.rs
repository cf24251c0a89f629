use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::streambridge::schema::EncodingStrategy;

use super::customizer::{ClientCustomizer, ClientSettings};

/// The full identity of a cacheable client: destination, encoding strategy
/// and the ordered customizer sequence.
///
/// Equality and hash are structural over all three fields. Customizers
/// compare by their declared [`identity`](ClientCustomizer::identity),
/// pairwise and order-sensitive: the same customizers in a different order
/// describe a different client.
#[derive(Clone)]
pub struct ClientDescriptor {
    destination: String,
    encoding: EncodingStrategy,
    customizers: Vec<Arc<dyn ClientCustomizer>>,
}

impl ClientDescriptor {
    pub fn new(destination: impl Into<String>, encoding: EncodingStrategy) -> Self {
        ClientDescriptor {
            destination: destination.into(),
            encoding,
            customizers: Vec::new(),
        }
    }

    /// Appends a customizer to the sequence.
    pub fn customizer(mut self, customizer: Arc<dyn ClientCustomizer>) -> Self {
        self.customizers.push(customizer);
        self
    }

    /// Appends customizers, preserving their order.
    pub fn customizers(
        mut self,
        customizers: impl IntoIterator<Item = Arc<dyn ClientCustomizer>>,
    ) -> Self {
        self.customizers.extend(customizers);
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn encoding(&self) -> &EncodingStrategy {
        &self.encoding
    }

    pub fn customizer_sequence(&self) -> &[Arc<dyn ClientCustomizer>] {
        &self.customizers
    }

    /// Runs the customizer sequence over default settings, producing the
    /// construction parameters for the connection provider.
    pub fn settings(&self) -> ClientSettings {
        let mut settings = ClientSettings::new();
        for customizer in &self.customizers {
            customizer.customize(&mut settings);
        }
        settings
    }
}

impl PartialEq for ClientDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.destination == other.destination
            && self.encoding == other.encoding
            && self.customizers.len() == other.customizers.len()
            && self
                .customizers
                .iter()
                .zip(other.customizers.iter())
                .all(|(a, b)| a.identity() == b.identity())
    }
}

impl Eq for ClientDescriptor {}

impl Hash for ClientDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.destination.hash(state);
        self.encoding.hash(state);
        for customizer in &self.customizers {
            customizer.identity().hash(state);
        }
    }
}

impl fmt::Debug for ClientDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identities: Vec<&str> = self.customizers.iter().map(|c| c.identity()).collect();
        f.debug_struct("ClientDescriptor")
            .field("destination", &self.destination)
            .field("encoding", &self.encoding)
            .field("customizers", &identities)
            .finish()
    }
}
