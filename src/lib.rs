//! # streambridge
//!
//! A typed client-side integration layer between application code and a
//! distributed pub/sub messaging broker: schema resolution, typed message
//! production/consumption, and pooled caching of the expensive network
//! client objects behind it all.
//!
//! ## Features
//!
//! - **Pooled clients**: producers and consumers are cached per
//!   (destination, encoding, customizers) identity — at most one live
//!   client per key, at most one construction per key even under
//!   concurrent first use, idle-time LRU eviction with clean teardown
//! - **Schema resolution**: runtime value types and wire-declared schema
//!   tokens resolve deterministically to an encoding strategy, including
//!   composite key/value payloads
//! - **Typed send/consume**: fluent builders encode and decode through the
//!   resolved strategy; Avro and Protobuf payloads plug in through explicit
//!   serializers
//! - **Broker-agnostic**: the transport lives behind the
//!   [`ConnectionProvider`] trait; an in-memory broker ships in
//!   [`testing`](crate::streambridge::testing) for tests and examples
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//! use streambridge::testing::MemoryBroker;
//! use streambridge::{BridgeConfig, SchemaKind, StreamBridge};
//!
//! #[derive(Serialize, Deserialize, Debug)]
//! struct OrderPlaced {
//!     id: u64,
//!     amount_cents: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (producers, consumers) = MemoryBroker::new().providers();
//!     let bridge = StreamBridge::new(
//!         producers,
//!         consumers,
//!         BridgeConfig::new().type_destination::<OrderPlaced>("orders"),
//!     );
//!
//!     let consumer = bridge
//!         .consume::<OrderPlaced>()
//!         .encoding(SchemaKind::Json)
//!         .begin()
//!         .await?;
//!
//!     bridge
//!         .send(&OrderPlaced { id: 1, amount_cents: 1299 })
//!         .encoding(SchemaKind::Json)
//!         .property("source", "web")
//!         .send()
//!         .await?;
//!
//!     let order = consumer.receive(Duration::from_secs(5)).await?;
//!     println!("received order {}", order.id);
//!
//!     bridge.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod streambridge;

// Re-export main API at crate root for easy access
pub use streambridge::cache::{CacheError, ClientCache, Clock, Lease, SystemClock};
pub use streambridge::client::{
    ClientCustomizer, ClientDescriptor, ClientError, ClientSettings, ConnectionProvider,
    ConsumerClient, InboundMessage, OutboundMessage, ProducerClient, PropertyCustomizer,
};
pub use streambridge::config::{BridgeConfig, CacheConfig};
pub use streambridge::error::BridgeError;
pub use streambridge::factory::{ConsumeRequest, SendRequest, StreamBridge, TypedConsumer};
pub use streambridge::schema::{
    DefaultSchemaResolver, EncodingStrategy, KeyValue, KeyValueEncoding, MessageType,
    PrimitiveKind, SchemaError, SchemaKind, SchemaResolver,
};
pub use streambridge::serialization::{
    decode_value, encode_value, BytesSerializer, JsonSerializer, SerializationError, Serializer,
    StringSerializer,
};

#[cfg(feature = "avro")]
pub use streambridge::serialization::AvroSerializer;
#[cfg(feature = "protobuf")]
pub use streambridge::serialization::ProtoSerializer;

// Keep the testing doubles easy to reach from integration tests.
pub use streambridge::testing;
