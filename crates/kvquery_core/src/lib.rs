//! # kvquery core
//!
//! The query layer over a transactional key-value store.
//!
//! This crate provides:
//! - [`SequenceReader`]: ordered, offset/limit reads driven by a cursor
//! - [`Condition`] evaluation with literal and operator matching
//! - [`QueryEngine`]: finds, counts and atomic batched writes
//! - [`JoinEngine`]: inner, left, right and full hash joins
//! - [`Database`]: the connection facade exposing all of the above
//!
//! Storage comes from any [`kvquery_storage::StorageBackend`]. All
//! filtering is a full scan; indexes are never used to answer queries.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod condition;
mod config;
mod connection;
mod database;
mod error;
mod join;
mod options;
mod query;
mod reader;

pub use condition::{filter, matches, Condition, FieldCondition, OperatorSet};
pub use config::Config;
pub use connection::Connection;
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use join::{hash_join, merge_records, JoinEngine};
pub use options::{paginate, JoinKeys, JoinOptions, JoinType, QueryOptions};
pub use query::QueryEngine;
pub use reader::SequenceReader;
