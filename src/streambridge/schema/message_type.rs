use std::any::{type_name, TypeId};

use serde::{Deserialize, Serialize};

/// A composite key/value payload.
///
/// Sending a `KeyValue` routes the key and value through independently
/// resolved encodings, packed according to the [`KeyValueEncoding`] mode of
/// the resolved strategy.
///
/// [`KeyValueEncoding`]: super::KeyValueEncoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KeyValue<K, V> {
    pub fn new(key: K, value: V) -> Self {
        KeyValue { key, value }
    }
}

/// Runtime identity of a message value type.
///
/// Wraps the `TypeId` and type name of a concrete Rust type, with an
/// optional pair of component types for composite key/value messages. Used
/// by the schema resolver to look up encoding strategies and by the factory
/// to key per-type destination defaults.
///
/// Composite types must be built through [`MessageType::key_value_of`]:
/// generic parameters are not recoverable from a bare `TypeId` at runtime,
/// so the component types are captured eagerly at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
    key_value: Option<Box<(MessageType, MessageType)>>,
}

impl MessageType {
    /// Describes a plain (non-composite) message type.
    pub fn of<T: 'static>() -> Self {
        MessageType {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            key_value: None,
        }
    }

    /// Describes a composite [`KeyValue`] message type, capturing the key
    /// and value component types.
    pub fn key_value_of<K: 'static, V: 'static>() -> Self {
        MessageType {
            id: TypeId::of::<KeyValue<K, V>>(),
            name: type_name::<KeyValue<K, V>>(),
            key_value: Some(Box::new((MessageType::of::<K>(), MessageType::of::<V>()))),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.name
    }

    pub fn is_key_value(&self) -> bool {
        self.key_value.is_some()
    }

    /// Component types of a composite message type, key first.
    pub fn key_value_types(&self) -> Option<(&MessageType, &MessageType)> {
        self.key_value.as_deref().map(|pair| (&pair.0, &pair.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_type_identity() {
        assert_eq!(MessageType::of::<String>(), MessageType::of::<String>());
        assert_ne!(MessageType::of::<String>(), MessageType::of::<i32>());
        assert!(!MessageType::of::<String>().is_key_value());
    }

    #[test]
    fn test_key_value_type_captures_components() {
        let mt = MessageType::key_value_of::<String, i32>();
        assert!(mt.is_key_value());
        let (key, value) = mt.key_value_types().unwrap();
        assert_eq!(*key, MessageType::of::<String>());
        assert_eq!(*value, MessageType::of::<i32>());
    }

    #[test]
    fn test_key_value_types_are_order_sensitive() {
        assert_ne!(
            MessageType::key_value_of::<String, i32>(),
            MessageType::key_value_of::<i32, String>()
        );
    }
}
