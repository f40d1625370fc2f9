//! Conversion between values and JSON.
//!
//! JSON numbers become integers when they are whole and fit in an `i64`,
//! and floats otherwise. Byte strings are written as arrays of numbers
//! and therefore read back as arrays.

use crate::error::{CodecError, CodecResult};
use crate::record::Record;
use crate::value::Value;
use serde_json::{Map, Number, Value as Json};

impl Value {
    /// Converts a JSON value.
    ///
    /// # Errors
    ///
    /// Fails on whole numbers too large for an `i64`.
    pub fn from_json(json: Json) -> CodecResult<Self> {
        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => number_to_value(&n)?,
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::from_json)
                    .collect::<CodecResult<_>>()?,
            ),
            Json::Object(object) => Value::map(
                object
                    .into_iter()
                    .map(|(k, v)| Ok((Value::Text(k), Value::from_json(v)?)))
                    .collect::<CodecResult<_>>()?,
            ),
        })
    }

    /// Converts to JSON.
    ///
    /// # Errors
    ///
    /// Fails if a map has a key that is not text, or on a NaN or
    /// infinite float.
    pub fn to_json(&self) -> CodecResult<Json> {
        Ok(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(n) => Json::Number(Number::from(*n)),
            Value::Float(f) => {
                Json::Number(Number::from_f64(*f).ok_or(CodecError::NonFiniteFloat)?)
            }
            Value::Bytes(bytes) => {
                Json::Array(bytes.iter().map(|b| Json::Number(Number::from(*b))).collect())
            }
            Value::Text(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<CodecResult<_>>()?,
            ),
            Value::Map(pairs) => {
                let mut object = Map::new();
                for (k, v) in pairs {
                    let Value::Text(name) = k else {
                        return Err(CodecError::invalid_structure(format!(
                            "map key of type {} cannot be a JSON object key",
                            k.type_name()
                        )));
                    };
                    object.insert(name.clone(), v.to_json()?);
                }
                Json::Object(object)
            }
        })
    }
}

impl Record {
    /// Converts a JSON object into a record.
    ///
    /// # Errors
    ///
    /// Fails if `json` is not an object or holds an out-of-range integer.
    pub fn from_json(json: Json) -> CodecResult<Self> {
        match json {
            Json::Object(object) => object
                .into_iter()
                .map(|(k, v)| Ok((k, Value::from_json(v)?)))
                .collect(),
            other => Err(CodecError::invalid_structure(format!(
                "expected a JSON object for a record, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Converts the record into a JSON object.
    ///
    /// # Errors
    ///
    /// Fails if a nested map has a non-text key or a float is not finite.
    pub fn to_json(&self) -> CodecResult<Json> {
        let mut object = Map::new();
        for (name, value) in self.iter() {
            object.insert(name.to_string(), value.to_json()?);
        }
        Ok(Json::Object(object))
    }
}

fn number_to_value(n: &Number) -> CodecResult<Value> {
    if let Some(i) = n.as_i64() {
        Ok(Value::Integer(i))
    } else if n.is_u64() {
        Err(CodecError::IntegerOverflow)
    } else {
        n.as_f64()
            .map(Value::Float)
            .ok_or_else(|| CodecError::unsupported_type("number"))
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
