//! The client factory: fluent typed send/consume over pooled clients.
//!
//! [`StreamBridge`] merges process-wide defaults with per-call options,
//! resolves the encoding strategy and destination, builds the
//! [`ClientDescriptor`] and routes the operation through a cached client
//! lease, which is released on every exit path.
//!
//! # Destination precedence
//!
//! The fluent send/consume API resolves the destination in three steps:
//! explicit per-call destination, then the per-message-type mapping from
//! [`BridgeConfig::type_destinations`], then the process-wide default. The
//! direct [`producer`]/[`consumer`] lease API skips the per-type step — it
//! has no message value to key the mapping on. That asymmetry is
//! deliberate.
//!
//! [`ClientDescriptor`]: crate::streambridge::client::ClientDescriptor
//! [`BridgeConfig::type_destinations`]: crate::streambridge::config::BridgeConfig
//! [`producer`]: StreamBridge::producer
//! [`consumer`]: StreamBridge::consumer

mod consume;
mod send;

pub use consume::{ConsumeRequest, TypedConsumer};
pub use send::SendRequest;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::streambridge::cache::{ClientCache, Lease};
use crate::streambridge::client::{
    ClientCustomizer, ClientDescriptor, ConnectionProvider, ConsumerClient, ProducerClient,
};
use crate::streambridge::config::BridgeConfig;
use crate::streambridge::error::BridgeError;
use crate::streambridge::schema::{
    DefaultSchemaResolver, EncodingStrategy, MessageType, SchemaKind, SchemaResolver,
};

/// Client factory over a producer provider and a consumer provider.
///
/// Owns one client cache per side, so a producer and a consumer for the
/// same destination and encoding never collide on a descriptor.
///
/// # Example
///
/// ```rust,no_run
/// use streambridge::testing::MemoryBroker;
/// use streambridge::{BridgeConfig, SchemaKind, StreamBridge};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize, Deserialize)]
/// struct Reading { sensor: String, celsius: f64 }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (producers, consumers) = MemoryBroker::new().providers();
/// let bridge = StreamBridge::new(
///     producers,
///     consumers,
///     BridgeConfig::new().type_destination::<Reading>("readings"),
/// );
///
/// let consumer = bridge
///     .consume::<Reading>()
///     .encoding(SchemaKind::Json)
///     .begin()
///     .await?;
///
/// let reading = Reading { sensor: "t-1".into(), celsius: 21.5 };
/// bridge.send(&reading).encoding(SchemaKind::Json).send().await?;
///
/// let received = consumer.receive(Duration::from_secs(1)).await?;
/// assert_eq!(received.sensor, "t-1");
/// # Ok(())
/// # }
/// ```
pub struct StreamBridge<P, C>
where
    P: ConnectionProvider,
    P::Handle: ProducerClient,
    C: ConnectionProvider,
    C::Handle: ConsumerClient,
{
    producers: ClientCache<P>,
    consumers: ClientCache<C>,
    resolver: Arc<dyn SchemaResolver>,
    config: BridgeConfig,
}

impl<P, C> StreamBridge<P, C>
where
    P: ConnectionProvider,
    P::Handle: ProducerClient,
    C: ConnectionProvider,
    C::Handle: ConsumerClient,
{
    pub fn new(producer_provider: P, consumer_provider: C, config: BridgeConfig) -> Self {
        Self::with_resolver(
            producer_provider,
            consumer_provider,
            config,
            Arc::new(DefaultSchemaResolver::new()),
        )
    }

    /// Builds a bridge with a caller-supplied schema resolver.
    pub fn with_resolver(
        producer_provider: P,
        consumer_provider: C,
        config: BridgeConfig,
        resolver: Arc<dyn SchemaResolver>,
    ) -> Self {
        StreamBridge {
            producers: ClientCache::new(producer_provider, config.cache.clone()),
            consumers: ClientCache::new(consumer_provider, config.cache.clone()),
            resolver,
            config,
        }
    }

    /// Starts a fluent send of `value`.
    pub fn send<'a, T: Serialize + 'static>(&'a self, value: &'a T) -> SendRequest<'a, T, P, C> {
        SendRequest::new(self, value, MessageType::of::<T>())
    }

    /// Starts a fluent send of a composite key/value pair.
    pub fn send_key_value<'a, K, V>(
        &'a self,
        pair: &'a crate::streambridge::schema::KeyValue<K, V>,
    ) -> SendRequest<'a, crate::streambridge::schema::KeyValue<K, V>, P, C>
    where
        K: Serialize + 'static,
        V: Serialize + 'static,
    {
        SendRequest::new(self, pair, MessageType::key_value_of::<K, V>())
    }

    /// Starts a fluent consume of messages decoded as `T`.
    pub fn consume<T: DeserializeOwned + 'static>(&self) -> ConsumeRequest<'_, T, P, C> {
        ConsumeRequest::new(self, MessageType::of::<T>())
    }

    /// Starts a fluent consume of composite key/value pairs.
    pub fn consume_key_value<K, V>(
        &self,
    ) -> ConsumeRequest<'_, crate::streambridge::schema::KeyValue<K, V>, P, C>
    where
        K: DeserializeOwned + 'static,
        V: DeserializeOwned + 'static,
    {
        ConsumeRequest::new(self, MessageType::key_value_of::<K, V>())
    }

    /// Leases a raw producer handle.
    ///
    /// Unlike the fluent API, the per-message-type destination mapping is
    /// not consulted: explicit destination, then the configured default.
    pub async fn producer(
        &self,
        destination: Option<&str>,
        kind: SchemaKind,
        message_type: Option<&MessageType>,
        customizers: Vec<Arc<dyn ClientCustomizer>>,
    ) -> Result<Lease<P>, BridgeError> {
        let strategy = self.resolver.resolve_by_kind(kind, message_type)?;
        let destination = self.resolve_destination(destination, None)?;
        let descriptor = self.build_descriptor(destination, strategy, customizers);
        Ok(self.producers.lease(&descriptor).await?)
    }

    /// Leases a raw consumer handle. Same destination rules as
    /// [`producer`](Self::producer).
    pub async fn consumer(
        &self,
        destination: Option<&str>,
        kind: SchemaKind,
        message_type: Option<&MessageType>,
        customizers: Vec<Arc<dyn ClientCustomizer>>,
    ) -> Result<Lease<C>, BridgeError> {
        let strategy = self.resolver.resolve_by_kind(kind, message_type)?;
        let destination = self.resolve_destination(destination, None)?;
        let descriptor = self.build_descriptor(destination, strategy, customizers);
        Ok(self.consumers.lease(&descriptor).await?)
    }

    /// Evicts idle clients from both caches. Returns how many were evicted.
    pub async fn evict_idle(&self) -> usize {
        self.producers.evict_idle().await + self.consumers.evict_idle().await
    }

    /// Shuts down both caches, closing every pooled client.
    pub async fn shutdown(&self) {
        self.producers.shutdown().await;
        self.consumers.shutdown().await;
    }

    pub fn producer_cache(&self) -> &ClientCache<P> {
        &self.producers
    }

    pub fn consumer_cache(&self) -> &ClientCache<C> {
        &self.consumers
    }

    pub(super) fn resolver(&self) -> &dyn SchemaResolver {
        self.resolver.as_ref()
    }

    pub(super) fn resolve_destination(
        &self,
        explicit: Option<&str>,
        message_type: Option<&MessageType>,
    ) -> Result<String, BridgeError> {
        if let Some(destination) = explicit {
            return Ok(destination.to_string());
        }
        if let Some(mt) = message_type {
            if let Some(destination) = self.config.type_destinations.get(mt) {
                return Ok(destination.clone());
            }
        }
        self.config
            .default_destination
            .clone()
            .ok_or(BridgeError::NoDestinationResolved)
    }

    /// Builds the cache key: process-wide default customizers first, then
    /// per-call customizers, order preserved on both sides.
    pub(super) fn build_descriptor(
        &self,
        destination: String,
        strategy: EncodingStrategy,
        per_call: Vec<Arc<dyn ClientCustomizer>>,
    ) -> ClientDescriptor {
        ClientDescriptor::new(destination, strategy)
            .customizers(self.config.default_customizers.iter().cloned())
            .customizers(per_call)
    }
}
