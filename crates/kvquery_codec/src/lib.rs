//! # kvquery codec
//!
//! Record and value model for kvquery.
//!
//! This crate provides:
//! - [`Value`], the dynamic field value, with store-key ordering and
//!   native comparison
//! - [`Record`], a schema-less field-name to value mapping
//! - Deterministic CBOR encoding of records (used by storage backends)
//! - JSON conversion (used by the CLI and fixtures)
//!
//! ## Usage
//!
//! ```
//! use kvquery_codec::{decode_record, encode_record, Record, Value};
//!
//! let record = Record::new().with("id", 1).with("name", "Alice");
//! let bytes = encode_record(&record).unwrap();
//! let decoded = decode_record(&bytes).unwrap();
//! assert_eq!(decoded.get("name"), Some(&Value::from("Alice")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod json;
mod record;
mod value;

pub use cbor::{decode_record, encode_record};
pub use error::{CodecError, CodecResult};
pub use record::Record;
pub use value::Value;
