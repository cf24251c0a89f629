use std::any::TypeId;
use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::encoding::{EncodingStrategy, KeyValueEncoding, PrimitiveKind, SchemaKind};
use super::error::SchemaError;
use super::message_type::MessageType;

/// Maps message value types (or wire-declared schema tokens) to encoding
/// strategies.
///
/// Implementations must be deterministic: identical inputs resolve to the
/// same strategy on every call, since the result participates in the client
/// cache key.
pub trait SchemaResolver: Send + Sync {
    /// Resolves by runtime message type.
    ///
    /// When no mapping exists, returns [`EncodingStrategy::Bytes`] if
    /// `return_default` is set, else fails with
    /// [`SchemaError::UnsupportedType`].
    fn resolve_by_message_type(
        &self,
        message_type: &MessageType,
        return_default: bool,
    ) -> Result<EncodingStrategy, SchemaError>;

    /// Resolves by an explicitly declared schema token.
    ///
    /// Structured tokens (`Json`, `Avro`, `Protobuf`, `KeyValue`) require a
    /// message type and fail with [`SchemaError::MissingType`] without one.
    /// The `None` token auto-detects from the runtime type.
    fn resolve_by_kind(
        &self,
        kind: SchemaKind,
        message_type: Option<&MessageType>,
    ) -> Result<EncodingStrategy, SchemaError>;
}

fn base_mappings() -> &'static HashMap<TypeId, EncodingStrategy> {
    static BASE_MAPPINGS: OnceLock<HashMap<TypeId, EncodingStrategy>> = OnceLock::new();
    BASE_MAPPINGS.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert(TypeId::of::<Vec<u8>>(), EncodingStrategy::Bytes);
        m.insert(
            TypeId::of::<String>(),
            EncodingStrategy::Primitive(PrimitiveKind::Str),
        );
        m.insert(
            TypeId::of::<&'static str>(),
            EncodingStrategy::Primitive(PrimitiveKind::Str),
        );
        m.insert(
            TypeId::of::<bool>(),
            EncodingStrategy::Primitive(PrimitiveKind::Boolean),
        );
        m.insert(
            TypeId::of::<i8>(),
            EncodingStrategy::Primitive(PrimitiveKind::Int8),
        );
        m.insert(
            TypeId::of::<i16>(),
            EncodingStrategy::Primitive(PrimitiveKind::Int16),
        );
        m.insert(
            TypeId::of::<i32>(),
            EncodingStrategy::Primitive(PrimitiveKind::Int32),
        );
        m.insert(
            TypeId::of::<i64>(),
            EncodingStrategy::Primitive(PrimitiveKind::Int64),
        );
        m.insert(
            TypeId::of::<f32>(),
            EncodingStrategy::Primitive(PrimitiveKind::Float32),
        );
        m.insert(
            TypeId::of::<f64>(),
            EncodingStrategy::Primitive(PrimitiveKind::Float64),
        );
        m.insert(
            TypeId::of::<std::time::SystemTime>(),
            EncodingStrategy::Primitive(PrimitiveKind::Timestamp),
        );
        m.insert(
            TypeId::of::<DateTime<Utc>>(),
            EncodingStrategy::Primitive(PrimitiveKind::Instant),
        );
        m.insert(
            TypeId::of::<NaiveDate>(),
            EncodingStrategy::Primitive(PrimitiveKind::LocalDate),
        );
        m.insert(
            TypeId::of::<NaiveTime>(),
            EncodingStrategy::Primitive(PrimitiveKind::LocalTime),
        );
        m.insert(
            TypeId::of::<NaiveDateTime>(),
            EncodingStrategy::Primitive(PrimitiveKind::LocalDateTime),
        );
        m
    })
}

/// Default schema resolver capable of handling basic message types.
///
/// Consults a process-wide immutable table of primitive mappings first, then
/// any custom mappings registered at construction, then applies the
/// default-fallback policy.
///
/// # Example
///
/// ```rust
/// use streambridge::{DefaultSchemaResolver, EncodingStrategy, MessageType, SchemaResolver};
///
/// #[derive(serde::Serialize)]
/// struct Order { id: u64 }
///
/// let resolver = DefaultSchemaResolver::new()
///     .custom_mapping::<Order>(EncodingStrategy::Json(MessageType::of::<Order>()));
///
/// let strategy = resolver
///     .resolve_by_message_type(&MessageType::of::<Order>(), false)
///     .unwrap();
/// assert_eq!(strategy, EncodingStrategy::Json(MessageType::of::<Order>()));
/// ```
#[derive(Debug, Default)]
pub struct DefaultSchemaResolver {
    custom_mappings: HashMap<TypeId, EncodingStrategy>,
}

impl DefaultSchemaResolver {
    /// Constructs a resolver with no custom type mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom mapping for `T`, consulted after the base table.
    pub fn custom_mapping<T: 'static>(mut self, strategy: EncodingStrategy) -> Self {
        self.custom_mappings.insert(TypeId::of::<T>(), strategy);
        self
    }

    fn key_value_strategy(
        &self,
        message_type: &MessageType,
    ) -> Result<EncodingStrategy, SchemaError> {
        let (key_type, value_type) = message_type
            .key_value_types()
            .ok_or(SchemaError::MissingType(SchemaKind::KeyValue))?;
        // Both sides must resolve; a key-only resolution is never returned.
        let key = self.resolve_by_kind(SchemaKind::None, Some(key_type))?;
        let value = self.resolve_by_kind(SchemaKind::None, Some(value_type))?;
        Ok(EncodingStrategy::KeyValue(
            Box::new(key),
            Box::new(value),
            KeyValueEncoding::Inline,
        ))
    }
}

fn require_message_type<'a>(
    kind: SchemaKind,
    message_type: Option<&'a MessageType>,
) -> Result<&'a MessageType, SchemaError> {
    message_type.ok_or(SchemaError::MissingType(kind))
}

impl SchemaResolver for DefaultSchemaResolver {
    fn resolve_by_message_type(
        &self,
        message_type: &MessageType,
        return_default: bool,
    ) -> Result<EncodingStrategy, SchemaError> {
        if let Some(strategy) = base_mappings().get(&message_type.type_id()) {
            return Ok(strategy.clone());
        }
        if let Some(strategy) = self.custom_mappings.get(&message_type.type_id()) {
            return Ok(strategy.clone());
        }
        if return_default {
            Ok(EncodingStrategy::Bytes)
        } else {
            Err(SchemaError::UnsupportedType(
                message_type.type_name().to_string(),
            ))
        }
    }

    fn resolve_by_kind(
        &self,
        kind: SchemaKind,
        message_type: Option<&MessageType>,
    ) -> Result<EncodingStrategy, SchemaError> {
        match kind {
            SchemaKind::Str => Ok(EncodingStrategy::Primitive(PrimitiveKind::Str)),
            SchemaKind::Boolean => Ok(EncodingStrategy::Primitive(PrimitiveKind::Boolean)),
            SchemaKind::Int8 => Ok(EncodingStrategy::Primitive(PrimitiveKind::Int8)),
            SchemaKind::Int16 => Ok(EncodingStrategy::Primitive(PrimitiveKind::Int16)),
            SchemaKind::Int32 => Ok(EncodingStrategy::Primitive(PrimitiveKind::Int32)),
            SchemaKind::Int64 => Ok(EncodingStrategy::Primitive(PrimitiveKind::Int64)),
            SchemaKind::Float32 => Ok(EncodingStrategy::Primitive(PrimitiveKind::Float32)),
            SchemaKind::Float64 => Ok(EncodingStrategy::Primitive(PrimitiveKind::Float64)),
            SchemaKind::Date => Ok(EncodingStrategy::Primitive(PrimitiveKind::Date)),
            SchemaKind::Time => Ok(EncodingStrategy::Primitive(PrimitiveKind::Time)),
            SchemaKind::Timestamp => Ok(EncodingStrategy::Primitive(PrimitiveKind::Timestamp)),
            SchemaKind::Instant => Ok(EncodingStrategy::Primitive(PrimitiveKind::Instant)),
            SchemaKind::LocalDate => Ok(EncodingStrategy::Primitive(PrimitiveKind::LocalDate)),
            SchemaKind::LocalTime => Ok(EncodingStrategy::Primitive(PrimitiveKind::LocalTime)),
            SchemaKind::LocalDateTime => {
                Ok(EncodingStrategy::Primitive(PrimitiveKind::LocalDateTime))
            }
            SchemaKind::Bytes => Ok(EncodingStrategy::Bytes),
            SchemaKind::Json => {
                let mt = require_message_type(kind, message_type)?;
                Ok(EncodingStrategy::Json(mt.clone()))
            }
            SchemaKind::Avro => {
                let mt = require_message_type(kind, message_type)?;
                Ok(EncodingStrategy::Avro(mt.clone()))
            }
            SchemaKind::Protobuf => {
                let mt = require_message_type(kind, message_type)?;
                Ok(EncodingStrategy::Protobuf(mt.clone()))
            }
            SchemaKind::KeyValue => {
                let mt = require_message_type(kind, message_type)?;
                self.key_value_strategy(mt)
            }
            SchemaKind::None => match message_type {
                None => Ok(EncodingStrategy::Bytes),
                Some(mt) if mt.is_key_value() => self.key_value_strategy(mt),
                Some(mt) => self.resolve_by_message_type(mt, false),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unmapped;

    #[test]
    fn test_primitive_resolution_is_deterministic() {
        let resolver = DefaultSchemaResolver::new();
        let mt = MessageType::of::<i32>();
        let first = resolver.resolve_by_message_type(&mt, false).unwrap();
        let second = resolver.resolve_by_message_type(&mt, false).unwrap();
        assert_eq!(first, EncodingStrategy::Primitive(PrimitiveKind::Int32));
        assert_eq!(first, second, "Repeated resolution must be stable");
    }

    #[test]
    fn test_base_table_covers_primitives() {
        let resolver = DefaultSchemaResolver::new();
        let cases = [
            (
                MessageType::of::<String>(),
                EncodingStrategy::Primitive(PrimitiveKind::Str),
            ),
            (
                MessageType::of::<bool>(),
                EncodingStrategy::Primitive(PrimitiveKind::Boolean),
            ),
            (
                MessageType::of::<i64>(),
                EncodingStrategy::Primitive(PrimitiveKind::Int64),
            ),
            (
                MessageType::of::<f64>(),
                EncodingStrategy::Primitive(PrimitiveKind::Float64),
            ),
            (MessageType::of::<Vec<u8>>(), EncodingStrategy::Bytes),
            (
                MessageType::of::<NaiveDate>(),
                EncodingStrategy::Primitive(PrimitiveKind::LocalDate),
            ),
            (
                MessageType::of::<DateTime<Utc>>(),
                EncodingStrategy::Primitive(PrimitiveKind::Instant),
            ),
        ];
        for (mt, expected) in cases {
            let resolved = resolver.resolve_by_message_type(&mt, false).unwrap();
            assert_eq!(resolved, expected, "wrong strategy for {}", mt.type_name());
        }
    }

    #[test]
    fn test_unmapped_type_fails_without_default() {
        let resolver = DefaultSchemaResolver::new();
        let result = resolver.resolve_by_message_type(&MessageType::of::<Unmapped>(), false);
        assert!(matches!(result, Err(SchemaError::UnsupportedType(_))));
    }

    #[test]
    fn test_unmapped_type_falls_back_to_bytes_with_default() {
        let resolver = DefaultSchemaResolver::new();
        let resolved = resolver
            .resolve_by_message_type(&MessageType::of::<Unmapped>(), true)
            .unwrap();
        assert_eq!(resolved, EncodingStrategy::Bytes);
    }

    #[test]
    fn test_custom_mapping_consulted_after_base_table() {
        let resolver = DefaultSchemaResolver::new().custom_mapping::<Unmapped>(
            EncodingStrategy::Json(MessageType::of::<Unmapped>()),
        );
        let resolved = resolver
            .resolve_by_message_type(&MessageType::of::<Unmapped>(), false)
            .unwrap();
        assert_eq!(
            resolved,
            EncodingStrategy::Json(MessageType::of::<Unmapped>())
        );
    }

    #[test]
    fn test_structured_kind_requires_message_type() {
        let resolver = DefaultSchemaResolver::new();
        for kind in [SchemaKind::Json, SchemaKind::Avro, SchemaKind::Protobuf] {
            let result = resolver.resolve_by_kind(kind, None);
            assert_eq!(result, Err(SchemaError::MissingType(kind)));
        }
    }

    #[test]
    fn test_key_value_resolution_matches_independent_resolution() {
        let resolver = DefaultSchemaResolver::new();
        let mt = MessageType::key_value_of::<String, i32>();
        let resolved = resolver.resolve_by_kind(SchemaKind::KeyValue, Some(&mt)).unwrap();

        let key = resolver
            .resolve_by_message_type(&MessageType::of::<String>(), false)
            .unwrap();
        let value = resolver
            .resolve_by_message_type(&MessageType::of::<i32>(), false)
            .unwrap();
        assert_eq!(
            resolved,
            EncodingStrategy::KeyValue(Box::new(key), Box::new(value), KeyValueEncoding::Inline)
        );
    }

    #[test]
    fn test_key_value_resolution_fails_when_value_side_unmapped() {
        let resolver = DefaultSchemaResolver::new();
        let mt = MessageType::key_value_of::<String, Unmapped>();
        let result = resolver.resolve_by_kind(SchemaKind::KeyValue, Some(&mt));
        assert!(
            matches!(result, Err(SchemaError::UnsupportedType(_))),
            "No partial key-only resolution"
        );
    }

    #[test]
    fn test_none_kind_auto_detects() {
        let resolver = DefaultSchemaResolver::new();

        // No message type: raw bytes.
        assert_eq!(
            resolver.resolve_by_kind(SchemaKind::None, None).unwrap(),
            EncodingStrategy::Bytes
        );

        // Composite type: key/value resolution.
        let kv = MessageType::key_value_of::<String, i64>();
        let resolved = resolver.resolve_by_kind(SchemaKind::None, Some(&kv)).unwrap();
        assert!(matches!(resolved, EncodingStrategy::KeyValue(_, _, KeyValueEncoding::Inline)));

        // Plain type: by runtime type, fallback disabled.
        let result = resolver.resolve_by_kind(SchemaKind::None, Some(&MessageType::of::<Unmapped>()));
        assert!(matches!(result, Err(SchemaError::UnsupportedType(_))));
    }
}
