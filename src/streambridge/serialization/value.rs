//! Strategy-driven encoding of typed values.
//!
//! Values are lowered to a `serde_json::Value` first, which gives the
//! encoder a uniform view of primitives, byte arrays and composite key/value
//! pairs without specialization. Primitive payloads use fixed-width
//! big-endian encodings; temporal kinds travel as epoch-based integers.
//! Inline key/value payloads pack both parts into one body, each prefixed
//! with a 4-byte big-endian length.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::streambridge::schema::{EncodingStrategy, KeyValueEncoding, PrimitiveKind};

use super::error::SerializationError;

// Days between 0001-01-01 (CE) and the Unix epoch.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Encodes a value according to a resolved encoding strategy.
///
/// Avro and Protobuf strategies are not encodable through serde reflection;
/// use an explicit [`Serializer`] for those payloads.
///
/// [`Serializer`]: super::Serializer
pub fn encode_value<T: Serialize>(
    strategy: &EncodingStrategy,
    value: &T,
) -> Result<Vec<u8>, SerializationError> {
    let json = serde_json::to_value(value)
        .map_err(|e| SerializationError::serialization_error("Failed to lower value", e))?;
    encode_json_value(strategy, json)
}

/// Decodes a payload according to a resolved encoding strategy.
pub fn decode_value<T: DeserializeOwned>(
    strategy: &EncodingStrategy,
    bytes: &[u8],
) -> Result<T, SerializationError> {
    let json = decode_json_value(strategy, bytes)?;
    serde_json::from_value(json)
        .map_err(|e| SerializationError::deserialization_error("Failed to raise value", e))
}

/// Encodes a composite pair into separate key and value payloads, for the
/// separated key/value transmission mode.
pub fn encode_key_value_parts<T: Serialize>(
    key_strategy: &EncodingStrategy,
    value_strategy: &EncodingStrategy,
    pair: &T,
) -> Result<(Vec<u8>, Vec<u8>), SerializationError> {
    let json = serde_json::to_value(pair)
        .map_err(|e| SerializationError::serialization_error("Failed to lower value", e))?;
    let (key, value) = split_key_value(json)?;
    let key_bytes = encode_json_value(key_strategy, key)?;
    let value_bytes = encode_json_value(value_strategy, value)?;
    Ok((key_bytes, value_bytes))
}

/// Decodes separate key and value payloads back into a composite pair.
pub fn decode_key_value_parts<T: DeserializeOwned>(
    key_strategy: &EncodingStrategy,
    value_strategy: &EncodingStrategy,
    key_bytes: &[u8],
    value_bytes: &[u8],
) -> Result<T, SerializationError> {
    let key = decode_json_value(key_strategy, key_bytes)?;
    let value = decode_json_value(value_strategy, value_bytes)?;
    let mut obj = serde_json::Map::new();
    obj.insert("key".to_string(), key);
    obj.insert("value".to_string(), value);
    serde_json::from_value(Value::Object(obj))
        .map_err(|e| SerializationError::deserialization_error("Failed to raise value", e))
}

fn encode_json_value(
    strategy: &EncodingStrategy,
    value: Value,
) -> Result<Vec<u8>, SerializationError> {
    match strategy {
        EncodingStrategy::Json(_) => serde_json::to_vec(&value)
            .map_err(|e| SerializationError::serialization_error("Failed to encode JSON", e)),
        EncodingStrategy::Bytes | EncodingStrategy::None => bytes_from_value(value),
        EncodingStrategy::Primitive(kind) => encode_primitive(*kind, value),
        EncodingStrategy::KeyValue(key_strategy, value_strategy, KeyValueEncoding::Inline) => {
            let (key, val) = split_key_value(value)?;
            let key_bytes = encode_json_value(key_strategy, key)?;
            let value_bytes = encode_json_value(value_strategy, val)?;
            Ok(pack_inline(&key_bytes, &value_bytes))
        }
        EncodingStrategy::KeyValue(_, _, KeyValueEncoding::Separated) => {
            Err(SerializationError::UnsupportedType(
                "separated key/value payloads are encoded part by part".to_string(),
            ))
        }
        EncodingStrategy::Avro(mt) => Err(SerializationError::UnsupportedType(format!(
            "Avro payloads for {} require an explicit serializer",
            mt.type_name()
        ))),
        EncodingStrategy::Protobuf(mt) => Err(SerializationError::UnsupportedType(format!(
            "Protobuf payloads for {} require an explicit serializer",
            mt.type_name()
        ))),
    }
}

fn decode_json_value(
    strategy: &EncodingStrategy,
    bytes: &[u8],
) -> Result<Value, SerializationError> {
    match strategy {
        EncodingStrategy::Json(_) => serde_json::from_slice(bytes)
            .map_err(|e| SerializationError::deserialization_error("Failed to decode JSON", e)),
        EncodingStrategy::Bytes | EncodingStrategy::None => {
            Ok(Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()))
        }
        EncodingStrategy::Primitive(kind) => decode_primitive(*kind, bytes),
        EncodingStrategy::KeyValue(key_strategy, value_strategy, KeyValueEncoding::Inline) => {
            let (key_bytes, value_bytes) = unpack_inline(bytes)?;
            let key = decode_json_value(key_strategy, key_bytes)?;
            let value = decode_json_value(value_strategy, value_bytes)?;
            let mut obj = serde_json::Map::new();
            obj.insert("key".to_string(), key);
            obj.insert("value".to_string(), value);
            Ok(Value::Object(obj))
        }
        EncodingStrategy::KeyValue(_, _, KeyValueEncoding::Separated) => {
            Err(SerializationError::UnsupportedType(
                "separated key/value payloads are decoded part by part".to_string(),
            ))
        }
        EncodingStrategy::Avro(mt) => Err(SerializationError::UnsupportedType(format!(
            "Avro payloads for {} require an explicit serializer",
            mt.type_name()
        ))),
        EncodingStrategy::Protobuf(mt) => Err(SerializationError::UnsupportedType(format!(
            "Protobuf payloads for {} require an explicit serializer",
            mt.type_name()
        ))),
    }
}

fn bytes_from_value(value: Value) -> Result<Vec<u8>, SerializationError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                item.as_u64()
                    .filter(|b| *b <= u8::MAX as u64)
                    .map(|b| b as u8)
                    .ok_or_else(|| {
                        SerializationError::UnsupportedType(
                            "byte payloads must be sequences of u8".to_string(),
                        )
                    })
            })
            .collect(),
        Value::String(s) => Ok(s.into_bytes()),
        other => Err(SerializationError::UnsupportedType(format!(
            "cannot encode {} as raw bytes",
            json_kind(&other)
        ))),
    }
}

fn split_key_value(value: Value) -> Result<(Value, Value), SerializationError> {
    match value {
        Value::Object(mut obj) => {
            let key = obj.remove("key");
            let val = obj.remove("value");
            match (key, val) {
                (Some(key), Some(val)) => Ok((key, val)),
                _ => Err(SerializationError::UnsupportedType(
                    "key/value payloads must carry both key and value fields".to_string(),
                )),
            }
        }
        other => Err(SerializationError::UnsupportedType(format!(
            "cannot encode {} as a key/value pair",
            json_kind(&other)
        ))),
    }
}

fn pack_inline(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(8 + key.len() + value.len());
    packed.extend_from_slice(&(key.len() as u32).to_be_bytes());
    packed.extend_from_slice(key);
    packed.extend_from_slice(&(value.len() as u32).to_be_bytes());
    packed.extend_from_slice(value);
    packed
}

fn unpack_inline(bytes: &[u8]) -> Result<(&[u8], &[u8]), SerializationError> {
    let truncated =
        || SerializationError::DeserializationFailed("truncated key/value payload".to_string());
    let (key_len, rest) = bytes.split_at_checked(4).ok_or_else(truncated)?;
    let key_len = u32::from_be_bytes(key_len.try_into().unwrap()) as usize;
    let (key, rest) = rest.split_at_checked(key_len).ok_or_else(truncated)?;
    let (value_len, rest) = rest.split_at_checked(4).ok_or_else(truncated)?;
    let value_len = u32::from_be_bytes(value_len.try_into().unwrap()) as usize;
    let (value, rest) = rest.split_at_checked(value_len).ok_or_else(truncated)?;
    if !rest.is_empty() {
        return Err(SerializationError::DeserializationFailed(
            "trailing bytes after key/value payload".to_string(),
        ));
    }
    Ok((key, value))
}

fn encode_primitive(kind: PrimitiveKind, value: Value) -> Result<Vec<u8>, SerializationError> {
    match kind {
        PrimitiveKind::Str => match value {
            Value::String(s) => Ok(s.into_bytes()),
            other => Err(mismatch(kind, &other)),
        },
        PrimitiveKind::Boolean => match value {
            Value::Bool(b) => Ok(vec![b as u8]),
            other => Err(mismatch(kind, &other)),
        },
        PrimitiveKind::Int8 => int_from_value(kind, &value, i8::MIN as i64, i8::MAX as i64)
            .map(|n| (n as i8).to_be_bytes().to_vec()),
        PrimitiveKind::Int16 => int_from_value(kind, &value, i16::MIN as i64, i16::MAX as i64)
            .map(|n| (n as i16).to_be_bytes().to_vec()),
        PrimitiveKind::Int32 => int_from_value(kind, &value, i32::MIN as i64, i32::MAX as i64)
            .map(|n| (n as i32).to_be_bytes().to_vec()),
        PrimitiveKind::Int64 => {
            int_from_value(kind, &value, i64::MIN, i64::MAX).map(|n| n.to_be_bytes().to_vec())
        }
        PrimitiveKind::Float32 => match value.as_f64() {
            Some(f) => Ok((f as f32).to_be_bytes().to_vec()),
            None => Err(mismatch(kind, &value)),
        },
        PrimitiveKind::Float64 => match value.as_f64() {
            Some(f) => Ok(f.to_be_bytes().to_vec()),
            None => Err(mismatch(kind, &value)),
        },
        PrimitiveKind::Date | PrimitiveKind::Time | PrimitiveKind::Timestamp => {
            epoch_millis_from_value(kind, value).map(|ms| ms.to_be_bytes().to_vec())
        }
        PrimitiveKind::Instant => instant_millis_from_value(kind, value)
            .map(|ms| ms.to_be_bytes().to_vec()),
        PrimitiveKind::LocalDate => match value {
            Value::String(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(|d| (d.num_days_from_ce() as i64 - EPOCH_DAYS_FROM_CE).to_be_bytes().to_vec())
                .map_err(|e| SerializationError::serialization_error("Invalid local date", e)),
            Value::Number(n) => n
                .as_i64()
                .map(|days| days.to_be_bytes().to_vec())
                .ok_or_else(|| mismatch(kind, &Value::Number(n))),
            other => Err(mismatch(kind, &other)),
        },
        PrimitiveKind::LocalTime => match value {
            Value::String(s) => NaiveTime::parse_from_str(&s, "%H:%M:%S%.f")
                .map(|t| nanos_of_day(&t).to_be_bytes().to_vec())
                .map_err(|e| SerializationError::serialization_error("Invalid local time", e)),
            Value::Number(n) => n
                .as_i64()
                .map(|nanos| nanos.to_be_bytes().to_vec())
                .ok_or_else(|| mismatch(kind, &Value::Number(n))),
            other => Err(mismatch(kind, &other)),
        },
        PrimitiveKind::LocalDateTime => match value {
            Value::String(s) => NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.and_utc().timestamp_millis().to_be_bytes().to_vec())
                .map_err(|e| {
                    SerializationError::serialization_error("Invalid local date-time", e)
                }),
            Value::Number(n) => n
                .as_i64()
                .map(|ms| ms.to_be_bytes().to_vec())
                .ok_or_else(|| mismatch(kind, &Value::Number(n))),
            other => Err(mismatch(kind, &other)),
        },
    }
}

fn decode_primitive(kind: PrimitiveKind, bytes: &[u8]) -> Result<Value, SerializationError> {
    match kind {
        PrimitiveKind::Str => String::from_utf8(bytes.to_vec())
            .map(Value::String)
            .map_err(|e| SerializationError::deserialization_error("Invalid UTF-8", e)),
        PrimitiveKind::Boolean => match bytes {
            [b] => Ok(Value::Bool(*b != 0)),
            _ => Err(width_mismatch(kind, 1, bytes.len())),
        },
        PrimitiveKind::Int8 => fixed_bytes::<1>(kind, bytes)
            .map(|b| Value::from(i8::from_be_bytes(b) as i64)),
        PrimitiveKind::Int16 => fixed_bytes::<2>(kind, bytes)
            .map(|b| Value::from(i16::from_be_bytes(b) as i64)),
        PrimitiveKind::Int32 => fixed_bytes::<4>(kind, bytes)
            .map(|b| Value::from(i32::from_be_bytes(b) as i64)),
        PrimitiveKind::Int64 => {
            fixed_bytes::<8>(kind, bytes).map(|b| Value::from(i64::from_be_bytes(b)))
        }
        PrimitiveKind::Float32 => fixed_bytes::<4>(kind, bytes)
            .map(|b| Value::from(f32::from_be_bytes(b) as f64)),
        PrimitiveKind::Float64 => {
            fixed_bytes::<8>(kind, bytes).map(|b| Value::from(f64::from_be_bytes(b)))
        }
        PrimitiveKind::Date | PrimitiveKind::Time => {
            fixed_bytes::<8>(kind, bytes).map(|b| Value::from(i64::from_be_bytes(b)))
        }
        PrimitiveKind::Timestamp => {
            let millis = fixed_bytes::<8>(kind, bytes).map(i64::from_be_bytes)?;
            // Shape matches the serde representation of std::time::SystemTime.
            let mut obj = serde_json::Map::new();
            obj.insert(
                "secs_since_epoch".to_string(),
                Value::from(millis.div_euclid(1000)),
            );
            obj.insert(
                "nanos_since_epoch".to_string(),
                Value::from(millis.rem_euclid(1000) * 1_000_000),
            );
            Ok(Value::Object(obj))
        }
        PrimitiveKind::Instant => {
            let millis = fixed_bytes::<8>(kind, bytes).map(i64::from_be_bytes)?;
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(|| {
                    SerializationError::DeserializationFailed(format!(
                        "instant out of range: {} ms",
                        millis
                    ))
                })
        }
        PrimitiveKind::LocalDate => {
            let days = fixed_bytes::<8>(kind, bytes).map(i64::from_be_bytes)?;
            NaiveDate::from_num_days_from_ce_opt((days + EPOCH_DAYS_FROM_CE) as i32)
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| {
                    SerializationError::DeserializationFailed(format!(
                        "local date out of range: {} days",
                        days
                    ))
                })
        }
        PrimitiveKind::LocalTime => {
            let nanos = fixed_bytes::<8>(kind, bytes).map(i64::from_be_bytes)?;
            let secs = nanos.div_euclid(NANOS_PER_SECOND);
            let frac = nanos.rem_euclid(NANOS_PER_SECOND);
            NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, frac as u32)
                .map(|t| Value::String(t.format("%H:%M:%S%.f").to_string()))
                .ok_or_else(|| {
                    SerializationError::DeserializationFailed(format!(
                        "local time out of range: {} ns",
                        nanos
                    ))
                })
        }
        PrimitiveKind::LocalDateTime => {
            let millis = fixed_bytes::<8>(kind, bytes).map(i64::from_be_bytes)?;
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map(|dt| {
                    Value::String(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
                })
                .ok_or_else(|| {
                    SerializationError::DeserializationFailed(format!(
                        "local date-time out of range: {} ms",
                        millis
                    ))
                })
        }
    }
}

fn nanos_of_day(time: &NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * NANOS_PER_SECOND + time.nanosecond() as i64
}

fn int_from_value(
    kind: PrimitiveKind,
    value: &Value,
    min: i64,
    max: i64,
) -> Result<i64, SerializationError> {
    value
        .as_i64()
        .filter(|n| (min..=max).contains(n))
        .ok_or_else(|| mismatch(kind, value))
}

fn epoch_millis_from_value(
    kind: PrimitiveKind,
    value: Value,
) -> Result<i64, SerializationError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| mismatch(kind, &Value::Number(n))),
        // serde representation of std::time::SystemTime.
        Value::Object(obj) => {
            let secs = obj.get("secs_since_epoch").and_then(Value::as_i64);
            let nanos = obj.get("nanos_since_epoch").and_then(Value::as_i64);
            match (secs, nanos) {
                (Some(secs), Some(nanos)) => Ok(secs * 1000 + nanos / 1_000_000),
                _ => Err(mismatch(kind, &Value::Object(obj))),
            }
        }
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| SerializationError::serialization_error("Invalid timestamp", e)),
        other => Err(mismatch(kind, &other)),
    }
}

fn instant_millis_from_value(
    kind: PrimitiveKind,
    value: Value,
) -> Result<i64, SerializationError> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| SerializationError::serialization_error("Invalid instant", e)),
        Value::Number(n) => n.as_i64().ok_or_else(|| mismatch(kind, &Value::Number(n))),
        other => Err(mismatch(kind, &other)),
    }
}

fn fixed_bytes<const N: usize>(
    kind: PrimitiveKind,
    bytes: &[u8],
) -> Result<[u8; N], SerializationError> {
    bytes
        .try_into()
        .map_err(|_| width_mismatch(kind, N, bytes.len()))
}

fn width_mismatch(kind: PrimitiveKind, expected: usize, got: usize) -> SerializationError {
    SerializationError::DeserializationFailed(format!(
        "{} payload must be {} bytes, got {}",
        kind, expected, got
    ))
}

fn mismatch(kind: PrimitiveKind, value: &Value) -> SerializationError {
    SerializationError::UnsupportedType(format!(
        "cannot encode {} as {}",
        json_kind(value),
        kind
    ))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streambridge::schema::{KeyValue, MessageType};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u64,
        symbol: String,
    }

    #[test]
    fn test_json_strategy_round_trip() {
        let strategy = EncodingStrategy::Json(MessageType::of::<Order>());
        let order = Order {
            id: 42,
            symbol: "ACME".to_string(),
        };
        let bytes = encode_value(&strategy, &order).unwrap();
        let back: Order = decode_value(&strategy, &bytes).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_int32_encodes_big_endian() {
        let strategy = EncodingStrategy::Primitive(PrimitiveKind::Int32);
        let bytes = encode_value(&strategy, &0x0102_0304_i32).unwrap();
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);
        let back: i32 = decode_value(&strategy, &bytes).unwrap();
        assert_eq!(back, 0x0102_0304);
    }

    #[test]
    fn test_int8_range_is_enforced() {
        let strategy = EncodingStrategy::Primitive(PrimitiveKind::Int8);
        let result = encode_value(&strategy, &300_i32);
        assert!(matches!(result, Err(SerializationError::UnsupportedType(_))));
    }

    #[test]
    fn test_string_strategy_is_raw_utf8() {
        let strategy = EncodingStrategy::Primitive(PrimitiveKind::Str);
        let bytes = encode_value(&strategy, &"payload".to_string()).unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[test]
    fn test_local_date_round_trip() {
        let strategy = EncodingStrategy::Primitive(PrimitiveKind::LocalDate);
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let bytes = encode_value(&strategy, &date).unwrap();
        let back: NaiveDate = decode_value(&strategy, &bytes).unwrap();
        assert_eq!(back, date);
    }

    #[test]
    fn test_instant_round_trip_preserves_millis() {
        let strategy = EncodingStrategy::Primitive(PrimitiveKind::Instant);
        let instant = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let bytes = encode_value(&strategy, &instant).unwrap();
        assert_eq!(bytes.len(), 8);
        let back: DateTime<Utc> = decode_value(&strategy, &bytes).unwrap();
        assert_eq!(back, instant);
    }

    #[test]
    fn test_inline_key_value_packs_length_prefixed_parts() {
        let strategy = EncodingStrategy::KeyValue(
            Box::new(EncodingStrategy::Primitive(PrimitiveKind::Str)),
            Box::new(EncodingStrategy::Primitive(PrimitiveKind::Int32)),
            KeyValueEncoding::Inline,
        );
        let pair = KeyValue::new("user-1".to_string(), 99_i32);
        let bytes = encode_value(&strategy, &pair).unwrap();

        // 4-byte key length, key, 4-byte value length, value.
        assert_eq!(&bytes[..4], &6_u32.to_be_bytes());
        assert_eq!(&bytes[4..10], b"user-1");
        assert_eq!(&bytes[10..14], &4_u32.to_be_bytes());

        let back: KeyValue<String, i32> = decode_value(&strategy, &bytes).unwrap();
        assert_eq!(back, pair);
    }

    #[test]
    fn test_truncated_inline_key_value_fails() {
        let strategy = EncodingStrategy::KeyValue(
            Box::new(EncodingStrategy::Primitive(PrimitiveKind::Str)),
            Box::new(EncodingStrategy::Primitive(PrimitiveKind::Str)),
            KeyValueEncoding::Inline,
        );
        let result: Result<KeyValue<String, String>, _> = decode_value(&strategy, &[0, 0, 0, 9, 1]);
        assert!(matches!(
            result,
            Err(SerializationError::DeserializationFailed(_))
        ));
    }

    #[test]
    fn test_avro_strategy_needs_explicit_serializer() {
        let strategy = EncodingStrategy::Avro(MessageType::of::<Order>());
        let result = encode_value(
            &strategy,
            &Order {
                id: 1,
                symbol: "X".to_string(),
            },
        );
        assert!(matches!(result, Err(SerializationError::UnsupportedType(_))));
    }

    #[test]
    fn test_bytes_strategy_passes_raw_payloads() {
        let strategy = EncodingStrategy::Bytes;
        let payload: Vec<u8> = vec![0, 127, 255];
        let bytes = encode_value(&strategy, &payload).unwrap();
        assert_eq!(bytes, payload);
        let back: Vec<u8> = decode_value(&strategy, &bytes).unwrap();
        assert_eq!(back, payload);
    }
}
