//! CBOR encoding of records.
//!
//! Records are written as CBOR maps with text keys in field-name order,
//! so encoding is deterministic: identical records produce identical
//! bytes.

use crate::error::{CodecError, CodecResult};
use crate::record::Record;
use crate::value::Value;
use ciborium::value::{Integer, Value as Cbor};

/// Encodes a record to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn encode_record(record: &Record) -> CodecResult<Vec<u8>> {
    let map = record
        .iter()
        .map(|(name, value)| (Cbor::Text(name.to_string()), to_cbor(value)))
        .collect();

    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&Cbor::Map(map), &mut bytes)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a record from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not a CBOR map with text keys, or
/// contain values outside the value model (tags, big integers).
pub fn decode_record(bytes: &[u8]) -> CodecResult<Record> {
    let cbor: Cbor = ciborium::de::from_reader(bytes)
        .map_err(|e| CodecError::decoding_failed(e.to_string()))?;

    let Cbor::Map(pairs) = cbor else {
        return Err(CodecError::invalid_structure("record is not a map"));
    };

    pairs
        .into_iter()
        .map(|(key, value)| match key {
            Cbor::Text(name) => Ok((name, from_cbor(value)?)),
            _ => Err(CodecError::invalid_structure("record field name is not text")),
        })
        .collect()
}

fn to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Integer(n) => Cbor::Integer(Integer::from(*n)),
        Value::Float(f) => Cbor::Float(*f),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Array(items) => Cbor::Array(items.iter().map(to_cbor).collect()),
        Value::Map(pairs) => Cbor::Map(
            pairs
                .iter()
                .map(|(k, v)| (to_cbor(k), to_cbor(v)))
                .collect(),
        ),
    }
}

fn from_cbor(cbor: Cbor) -> CodecResult<Value> {
    Ok(match cbor {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(n) => {
            Value::Integer(i64::try_from(n).map_err(|_| CodecError::IntegerOverflow)?)
        }
        Cbor::Float(f) => Value::Float(f),
        Cbor::Bytes(b) => Value::Bytes(b),
        Cbor::Text(s) => Value::Text(s),
        Cbor::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_cbor)
                .collect::<CodecResult<_>>()?,
        ),
        Cbor::Map(pairs) => Value::map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((from_cbor(k)?, from_cbor(v)?)))
                .collect::<CodecResult<_>>()?,
        ),
        Cbor::Tag(..) => return Err(CodecError::unsupported_type("tag")),
        _ => return Err(CodecError::unsupported_type("unknown")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new()
            .with("id", 7)
            .with("name", "Alice")
            .with("active", true)
            .with("avatar", vec![0xde_u8, 0xad])
            .with("tags", vec![Value::from("a"), Value::from("b")])
            .with("manager", Value::Null)
            .with("price", 19.75)
            .with(
                "address",
                Value::map(vec![(Value::from("city"), Value::from("Oslo"))]),
            )
    }

    #[test]
    fn record_survives_encoding() {
        let record = sample();
        let bytes = encode_record(&record).unwrap();
        assert_eq!(decode_record(&bytes).unwrap(), record);
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = Record::new().with("b", 2).with("a", 1);
        let b = Record::new().with("a", 1).with("b", 2);
        assert_eq!(encode_record(&a).unwrap(), encode_record(&b).unwrap());
    }

    #[test]
    fn non_map_is_rejected() {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&Cbor::Integer(Integer::from(5)), &mut bytes).unwrap();
        assert!(matches!(
            decode_record(&bytes),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn foreign_float_is_read() {
        let mut bytes = Vec::new();
        let map = Cbor::Map(vec![(Cbor::Text("x".into()), Cbor::Float(1.5))]);
        ciborium::ser::into_writer(&map, &mut bytes).unwrap();
        let record = decode_record(&bytes).unwrap();
        assert_eq!(record.get("x"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            decode_record(&[0xff, 0x00]),
            Err(CodecError::DecodingFailed { .. })
        ));
    }
}
