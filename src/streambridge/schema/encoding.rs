use std::fmt;

use super::message_type::MessageType;

/// Wire encoding for a single primitive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Str,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Date,
    Time,
    Timestamp,
    Instant,
    LocalDate,
    LocalTime,
    LocalDateTime,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Str => "string",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::Float32 => "float32",
            PrimitiveKind::Float64 => "float64",
            PrimitiveKind::Date => "date",
            PrimitiveKind::Time => "time",
            PrimitiveKind::Timestamp => "timestamp",
            PrimitiveKind::Instant => "instant",
            PrimitiveKind::LocalDate => "local-date",
            PrimitiveKind::LocalTime => "local-time",
            PrimitiveKind::LocalDateTime => "local-date-time",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a composite key/value payload travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyValueEncoding {
    /// Key and value are packed into one payload, each length-prefixed.
    #[default]
    Inline,
    /// Key travels in the message key field, value in the payload.
    Separated,
}

/// A wire-declared schema token, as carried by configuration or message
/// metadata. Dispatched exhaustively by the resolver; the token says what
/// the caller *declared*, the resolved [`EncodingStrategy`] says what the
/// client will actually do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Str,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Date,
    Time,
    Timestamp,
    Instant,
    LocalDate,
    LocalTime,
    LocalDateTime,
    Bytes,
    Json,
    Avro,
    Protobuf,
    KeyValue,
    /// No declared schema: the resolver auto-detects from the runtime type.
    None,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Str => "string",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int8 => "int8",
            SchemaKind::Int16 => "int16",
            SchemaKind::Int32 => "int32",
            SchemaKind::Int64 => "int64",
            SchemaKind::Float32 => "float32",
            SchemaKind::Float64 => "float64",
            SchemaKind::Date => "date",
            SchemaKind::Time => "time",
            SchemaKind::Timestamp => "timestamp",
            SchemaKind::Instant => "instant",
            SchemaKind::LocalDate => "local-date",
            SchemaKind::LocalTime => "local-time",
            SchemaKind::LocalDateTime => "local-date-time",
            SchemaKind::Bytes => "bytes",
            SchemaKind::Json => "json",
            SchemaKind::Avro => "avro",
            SchemaKind::Protobuf => "protobuf",
            SchemaKind::KeyValue => "key-value",
            SchemaKind::None => "none",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved wire-format plan for a message value type.
///
/// Immutable once resolved, and part of the [`ClientDescriptor`] cache key,
/// so two callers that resolve the same inputs share the same pooled client.
///
/// [`ClientDescriptor`]: crate::streambridge::client::ClientDescriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EncodingStrategy {
    Primitive(PrimitiveKind),
    Json(MessageType),
    Avro(MessageType),
    Protobuf(MessageType),
    KeyValue(
        Box<EncodingStrategy>,
        Box<EncodingStrategy>,
        KeyValueEncoding,
    ),
    /// Raw byte payloads, no codec applied.
    Bytes,
    /// No declared encoding; payloads pass through untouched.
    None,
}

impl fmt::Display for EncodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingStrategy::Primitive(kind) => write!(f, "primitive({})", kind),
            EncodingStrategy::Json(mt) => write!(f, "json({})", mt.type_name()),
            EncodingStrategy::Avro(mt) => write!(f, "avro({})", mt.type_name()),
            EncodingStrategy::Protobuf(mt) => write!(f, "protobuf({})", mt.type_name()),
            EncodingStrategy::KeyValue(key, value, mode) => {
                let mode = match mode {
                    KeyValueEncoding::Inline => "inline",
                    KeyValueEncoding::Separated => "separated",
                };
                write!(f, "key-value({}, {}, {})", key, value, mode)
            }
            EncodingStrategy::Bytes => f.write_str("bytes"),
            EncodingStrategy::None => f.write_str("none"),
        }
    }
}
