//! Schema resolution: mapping message value types (or wire-declared schema
//! tokens) to a concrete wire-encoding strategy.
//!
//! The resolver is a leaf component. It never touches the broker: it only
//! decides *which* encoding a producer or consumer client should declare and
//! which codec the serialization module should apply. The resolved
//! [`EncodingStrategy`] participates in the client cache key, so resolution
//! must be deterministic for identical inputs.

mod encoding;
mod error;
mod message_type;
mod resolver;

pub use encoding::{EncodingStrategy, KeyValueEncoding, PrimitiveKind, SchemaKind};
pub use error::SchemaError;
pub use message_type::{KeyValue, MessageType};
pub use resolver::{DefaultSchemaResolver, SchemaResolver};
