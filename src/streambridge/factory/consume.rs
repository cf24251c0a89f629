use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use serde::de::DeserializeOwned;

use crate::streambridge::cache::Lease;
use crate::streambridge::client::{
    ClientCustomizer, ClientError, ConnectionProvider, ConsumerClient, InboundMessage,
    ProducerClient,
};
use crate::streambridge::error::BridgeError;
use crate::streambridge::schema::{EncodingStrategy, KeyValueEncoding, MessageType, SchemaKind};
use crate::streambridge::serialization::{decode_key_value_parts, decode_value};

use super::StreamBridge;

/// Fluent builder for starting a typed consumer.
pub struct ConsumeRequest<'a, T, P, C>
where
    P: ConnectionProvider,
    P::Handle: ProducerClient,
    C: ConnectionProvider,
    C::Handle: ConsumerClient,
{
    bridge: &'a StreamBridge<P, C>,
    message_type: MessageType,
    destination: Option<String>,
    schema_kind: SchemaKind,
    customizers: Vec<Arc<dyn ClientCustomizer>>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T, P, C> ConsumeRequest<'a, T, P, C>
where
    T: DeserializeOwned,
    P: ConnectionProvider,
    P::Handle: ProducerClient,
    C: ConnectionProvider,
    C::Handle: ConsumerClient,
{
    pub(super) fn new(bridge: &'a StreamBridge<P, C>, message_type: MessageType) -> Self {
        ConsumeRequest {
            bridge,
            message_type,
            destination: None,
            schema_kind: SchemaKind::None,
            customizers: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Explicit destination, overriding the per-type and default mappings.
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Explicit schema token; defaults to auto-detection from the runtime
    /// type.
    pub fn encoding(mut self, kind: SchemaKind) -> Self {
        self.schema_kind = kind;
        self
    }

    /// Per-call customizer, applied after the configured defaults.
    pub fn customizer(mut self, customizer: Arc<dyn ClientCustomizer>) -> Self {
        self.customizers.push(customizer);
        self
    }

    /// Resolves schema and destination and leases the pooled consumer.
    pub async fn begin(self) -> Result<TypedConsumer<T, C>, BridgeError> {
        let strategy = self
            .bridge
            .resolver()
            .resolve_by_kind(self.schema_kind, Some(&self.message_type))?;
        let destination = self
            .bridge
            .resolve_destination(self.destination.as_deref(), Some(&self.message_type))?;
        let descriptor =
            self.bridge
                .build_descriptor(destination, strategy.clone(), self.customizers);
        let lease = self.bridge.consumer_cache().lease(&descriptor).await?;
        Ok(TypedConsumer {
            lease,
            strategy,
            _marker: PhantomData,
        })
    }
}

/// A leased consumer that decodes payloads per the resolved strategy.
///
/// Dropping the consumer releases the underlying client back to the cache;
/// the client itself stays pooled until idle eviction or shutdown.
pub struct TypedConsumer<T, C>
where
    C: ConnectionProvider,
    C::Handle: ConsumerClient,
{
    lease: Lease<C>,
    strategy: EncodingStrategy,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> TypedConsumer<T, C>
where
    T: DeserializeOwned,
    C: ConnectionProvider,
    C::Handle: ConsumerClient,
{
    /// Waits up to `timeout` for the next message and decodes it.
    pub async fn receive(&self, timeout: Duration) -> Result<T, BridgeError> {
        let message = self.lease.receive(timeout).await?;
        self.decode(message)
    }

    /// Waits up to `timeout` for the next message, returning it undecoded.
    pub async fn receive_raw(&self, timeout: Duration) -> Result<InboundMessage, BridgeError> {
        Ok(self.lease.receive(timeout).await?)
    }

    /// Endless stream of decoded messages, polling with `poll_timeout`.
    /// Timeouts surface as `Err` items; the stream itself never ends.
    pub fn stream(&self, poll_timeout: Duration) -> impl Stream<Item = Result<T, BridgeError>> + '_ {
        futures::stream::unfold(self, move |consumer| async move {
            let item = consumer.receive(poll_timeout).await;
            Some((item, consumer))
        })
    }

    fn decode(&self, message: InboundMessage) -> Result<T, BridgeError> {
        match &self.strategy {
            EncodingStrategy::KeyValue(key_strategy, value_strategy, KeyValueEncoding::Separated) => {
                let key_bytes = message.key.as_deref().ok_or_else(|| {
                    BridgeError::Client(ClientError::ReceiveFailed(
                        "separated key/value message without a key".to_string(),
                    ))
                })?;
                Ok(decode_key_value_parts(
                    key_strategy,
                    value_strategy,
                    key_bytes,
                    &message.payload,
                )?)
            }
            strategy => Ok(decode_value(strategy, &message.payload)?),
        }
    }
}
