use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::streambridge::client::{
    ClientCustomizer, ConnectionProvider, ConsumerClient, OutboundMessage, ProducerClient,
};
use crate::streambridge::error::BridgeError;
use crate::streambridge::schema::{EncodingStrategy, KeyValueEncoding, MessageType, SchemaKind};
use crate::streambridge::serialization::{
    encode_key_value_parts, encode_value, Serializer,
};

use super::StreamBridge;

/// Fluent builder for a single send.
///
/// Terminal methods resolve the schema and destination, lease the pooled
/// producer and hand the encoded message to it. The lease is dropped (and
/// the client released) on every exit path.
pub struct SendRequest<'a, T, P, C>
where
    P: ConnectionProvider,
    P::Handle: ProducerClient,
    C: ConnectionProvider,
    C::Handle: ConsumerClient,
{
    bridge: &'a StreamBridge<P, C>,
    value: &'a T,
    message_type: MessageType,
    destination: Option<String>,
    schema_kind: SchemaKind,
    key: Option<Vec<u8>>,
    properties: HashMap<String, String>,
    event_time: Option<DateTime<Utc>>,
    customizers: Vec<Arc<dyn ClientCustomizer>>,
}

impl<'a, T, P, C> SendRequest<'a, T, P, C>
where
    T: Serialize,
    P: ConnectionProvider,
    P::Handle: ProducerClient,
    C: ConnectionProvider,
    C::Handle: ConsumerClient,
{
    pub(super) fn new(
        bridge: &'a StreamBridge<P, C>,
        value: &'a T,
        message_type: MessageType,
    ) -> Self {
        SendRequest {
            bridge,
            value,
            message_type,
            destination: None,
            schema_kind: SchemaKind::None,
            key: None,
            properties: HashMap::new(),
            event_time: None,
            customizers: Vec::new(),
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

    /// Message key bytes.
    pub fn key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach a string property to the message.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn event_time(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = Some(event_time);
        self
    }

    /// Per-call customizer, applied after the configured defaults.
    pub fn customizer(mut self, customizer: Arc<dyn ClientCustomizer>) -> Self {
        self.customizers.push(customizer);
        self
    }

    /// Encodes the value per the resolved strategy and sends it.
    pub async fn send(self) -> Result<(), BridgeError> {
        let strategy = self
            .bridge
            .resolver()
            .resolve_by_kind(self.schema_kind, Some(&self.message_type))?;
        let (key, payload) = match &strategy {
            EncodingStrategy::KeyValue(key_strategy, value_strategy, KeyValueEncoding::Separated) => {
                let (key_bytes, value_bytes) =
                    encode_key_value_parts(key_strategy, value_strategy, self.value)?;
                (Some(key_bytes), value_bytes)
            }
            _ => (self.key.clone(), encode_value(&strategy, self.value)?),
        };
        self.dispatch(strategy, key, payload).await
    }

    /// Sends with an explicit serializer instead of the strategy-driven
    /// encoder. The resolved strategy still forms the cache key, so Avro and
    /// Protobuf payloads pool their clients like any other.
    pub async fn send_with_serializer<S>(self, serializer: &S) -> Result<(), BridgeError>
    where
        S: Serializer<T>,
    {
        let strategy = self
            .bridge
            .resolver()
            .resolve_by_kind(self.schema_kind, Some(&self.message_type))?;
        let payload = serializer.serialize(self.value)?;
        let key = self.key.clone();
        self.dispatch(strategy, key, payload).await
    }

    async fn dispatch(
        self,
        strategy: EncodingStrategy,
        key: Option<Vec<u8>>,
        payload: Vec<u8>,
    ) -> Result<(), BridgeError> {
        let destination = self
            .bridge
            .resolve_destination(self.destination.as_deref(), Some(&self.message_type))?;
        let descriptor = self
            .bridge
            .build_descriptor(destination, strategy, self.customizers);
        let lease = self.bridge.producer_cache().lease(&descriptor).await?;

        let mut message = OutboundMessage::new(payload);
        message.key = key;
        message.properties = self.properties;
        message.event_time = self.event_time;

        debug!(
            "Sending {} bytes to destination '{}'",
            message.payload.len(),
            descriptor.destination()
        );
        lease.send(message).await?;
        Ok(())
    }
}
