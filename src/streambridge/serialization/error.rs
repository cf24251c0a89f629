//! Error types for serialization

/// Serialization error type
#[derive(Debug)]
pub enum SerializationError {
    SerializationFailed(String),
    DeserializationFailed(String),
    UnsupportedType(String),
    SchemaError(String),
}

impl SerializationError {
    /// Build a serialization failure from a source error.
    pub fn serialization_error(msg: &str, err: impl std::fmt::Display) -> Self {
        SerializationError::SerializationFailed(format!("{}: {}", msg, err))
    }

    /// Build a deserialization failure from a source error.
    pub fn deserialization_error(msg: &str, err: impl std::fmt::Display) -> Self {
        SerializationError::DeserializationFailed(format!("{}: {}", msg, err))
    }
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::SerializationFailed(msg) => {
                write!(f, "Serialization failed: {}", msg)
            }
            SerializationError::DeserializationFailed(msg) => {
                write!(f, "Deserialization failed: {}", msg)
            }
            SerializationError::UnsupportedType(msg) => {
                write!(f, "Unsupported type: {}", msg)
            }
            SerializationError::SchemaError(msg) => {
                write!(f, "Schema error: {}", msg)
            }
        }
    }
}

impl std::error::Error for SerializationError {}
