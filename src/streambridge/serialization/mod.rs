//! Codec shims between typed values and wire payloads.
//!
//! The schema resolver decides *which* encoding applies; this module applies
//! it. JSON and primitive encodings are handled generically through serde;
//! Avro and Protobuf payloads go through explicit [`Serializer`]
//! implementations backed by `apache-avro` and `prost`.

mod error;
mod value;

#[cfg(feature = "avro")]
mod avro;
#[cfg(feature = "protobuf")]
mod protobuf;

pub use error::SerializationError;
pub use value::{decode_key_value_parts, decode_value, encode_key_value_parts, encode_value};

#[cfg(feature = "avro")]
pub use avro::AvroSerializer;
#[cfg(feature = "protobuf")]
pub use protobuf::ProtoSerializer;

use serde::{Deserialize, Serialize};

/// Trait for serializers that convert between objects and bytes.
pub trait Serializer<T> {
    /// Serialize an object to bytes
    fn serialize(&self, value: &T) -> Result<Vec<u8>, SerializationError>;

    /// Deserialize bytes to an object
    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializationError>;
}

// JSON Serialization Helpers
//==========================

/// Serialize a value to JSON bytes
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    serde_json::to_vec(value)
        .map_err(|e| SerializationError::serialization_error("Failed to serialize to JSON bytes", e))
}

/// Deserialize JSON bytes to a value
pub fn from_json<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(|e| {
        SerializationError::deserialization_error("Failed to deserialize from JSON bytes", e)
    })
}

/// JSON serializer implementation
pub struct JsonSerializer;

impl<T> Serializer<T> for JsonSerializer
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>, SerializationError> {
        to_json(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        from_json(bytes)
    }
}

/// Raw bytes serializer that performs no transformation
#[derive(Clone)]
pub struct BytesSerializer;

impl Serializer<Vec<u8>> for BytesSerializer {
    fn serialize(&self, value: &Vec<u8>) -> Result<Vec<u8>, SerializationError> {
        Ok(value.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>, SerializationError> {
        Ok(bytes.to_vec())
    }
}

/// String serializer that converts strings to/from UTF-8 bytes
#[derive(Clone)]
pub struct StringSerializer;

impl Serializer<String> for StringSerializer {
    fn serialize(&self, value: &String) -> Result<Vec<u8>, SerializationError> {
        Ok(value.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<String, SerializationError> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SerializationError::SchemaError(format!("Invalid UTF-8: {}", e)))
    }
}
