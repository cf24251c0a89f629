use std::io::Cursor;

use apache_avro::{
    from_avro_datum, to_avro_datum, types::Value as AvroValue, Schema as AvroSchema,
};

use super::error::SerializationError;
use super::Serializer;

/// Avro serializer over a fixed schema.
pub struct AvroSerializer {
    schema: AvroSchema,
}

impl AvroSerializer {
    pub fn new(schema: AvroSchema) -> Self {
        Self { schema }
    }

    /// Builds a serializer from a JSON schema definition.
    pub fn from_definition(definition: &str) -> Result<Self, SerializationError> {
        let schema = AvroSchema::parse_str(definition)
            .map_err(|e| SerializationError::SchemaError(format!("Invalid Avro schema: {}", e)))?;
        Ok(Self::new(schema))
    }

    pub fn schema(&self) -> &AvroSchema {
        &self.schema
    }
}

impl Serializer<AvroValue> for AvroSerializer {
    fn serialize(&self, value: &AvroValue) -> Result<Vec<u8>, SerializationError> {
        to_avro_datum(&self.schema, value.clone()).map_err(|e| {
            SerializationError::serialization_error("Failed to serialize to Avro bytes", e)
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<AvroValue, SerializationError> {
        let mut cursor = Cursor::new(bytes);
        from_avro_datum(&self.schema, &mut cursor, None).map_err(|e| {
            SerializationError::deserialization_error("Failed to deserialize from Avro bytes", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_SCHEMA: &str = r#"
    {
        "type": "record",
        "name": "User",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "age", "type": "int"}
        ]
    }
    "#;

    #[test]
    fn test_avro_round_trip() {
        let serializer = AvroSerializer::from_definition(USER_SCHEMA).unwrap();
        let value = AvroValue::Record(vec![
            ("name".to_string(), AvroValue::String("ada".to_string())),
            ("age".to_string(), AvroValue::Int(36)),
        ]);
        let bytes = serializer.serialize(&value).unwrap();
        let back = serializer.deserialize(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_invalid_schema_definition_is_rejected() {
        let result = AvroSerializer::from_definition("{not a schema}");
        assert!(matches!(result, Err(SerializationError::SchemaError(_))));
    }
}
