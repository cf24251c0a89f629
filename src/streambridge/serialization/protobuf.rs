use prost::Message;

use super::error::SerializationError;
use super::Serializer;

/// Protocol Buffers serializer for any `prost::Message`.
pub struct ProtoSerializer<T: Message + Default>(std::marker::PhantomData<T>);

impl<T: Message + Default> Default for ProtoSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Message + Default> ProtoSerializer<T> {
    pub fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<T: Message + Default> Serializer<T> for ProtoSerializer<T> {
    fn serialize(&self, message: &T) -> Result<Vec<u8>, SerializationError> {
        let mut buf = Vec::with_capacity(message.encoded_len());
        message.encode(&mut buf).map_err(|e| {
            SerializationError::serialization_error("Failed to encode protobuf message", e)
        })?;
        Ok(buf)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        T::decode(bytes).map_err(|e| {
            SerializationError::deserialization_error("Failed to decode protobuf message", e)
        })
    }
}
