use super::encoding::SchemaKind;

/// Error type for schema resolution failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No mapping exists for the message type and no default was requested.
    UnsupportedType(String),
    /// A structured schema token was used without a concrete message type.
    MissingType(SchemaKind),
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::UnsupportedType(name) => {
                write!(f, "No schema mapping for message type: {}", name)
            }
            SchemaError::MissingType(kind) => {
                write!(f, "Message type must be specified for {} schemas", kind)
            }
        }
    }
}

impl std::error::Error for SchemaError {}
