//! Unified error surface of the client factory.

use crate::streambridge::cache::CacheError;
use crate::streambridge::client::ClientError;
use crate::streambridge::schema::SchemaError;
use crate::streambridge::serialization::SerializationError;

/// Error type covering the full send/consume pipeline.
#[derive(Debug)]
pub enum BridgeError {
    /// Schema resolution failed.
    Schema(SchemaError),
    /// Payload encoding or decoding failed.
    Serialization(SerializationError),
    /// The client cache rejected the operation.
    Cache(CacheError),
    /// The client handle operation failed.
    Client(ClientError),
    /// No destination was supplied and none could be derived.
    NoDestinationResolved,
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::Schema(e) => write!(f, "Schema error: {}", e),
            BridgeError::Serialization(e) => write!(f, "Serialization error: {}", e),
            BridgeError::Cache(e) => write!(f, "Cache error: {}", e),
            BridgeError::Client(e) => write!(f, "Client error: {}", e),
            BridgeError::NoDestinationResolved => write!(
                f,
                "No destination: none supplied, no type mapping, no default configured"
            ),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Schema(e) => Some(e),
            BridgeError::Serialization(e) => Some(e),
            BridgeError::Cache(e) => Some(e),
            BridgeError::Client(e) => Some(e),
            BridgeError::NoDestinationResolved => None,
        }
    }
}

impl From<SchemaError> for BridgeError {
    fn from(err: SchemaError) -> Self {
        BridgeError::Schema(err)
    }
}

impl From<SerializationError> for BridgeError {
    fn from(err: SerializationError) -> Self {
        BridgeError::Serialization(err)
    }
}

impl From<CacheError> for BridgeError {
    fn from(err: CacheError) -> Self {
        BridgeError::Cache(err)
    }
}

impl From<ClientError> for BridgeError {
    fn from(err: ClientError) -> Self {
        BridgeError::Client(err)
    }
}
