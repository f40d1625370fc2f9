//! # kvquery storage
//!
//! Storage backend trait and implementations for kvquery.
//!
//! This crate is the storage collaborator of the query layer. The query
//! layer needs exactly three things from a store:
//!
//! - an ordered, abandonable cursor over a table ([`RecordCursor`])
//! - a point lookup by key
//! - an atomic batch of writes ([`BatchOp`])
//!
//! Everything else (opening, closing, creating and dropping tables) is
//! the backend's own lifecycle and is not part of [`StorageBackend`].
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - A transactional object store held in memory
//!
//! ## Example
//!
//! ```rust
//! use kvquery_codec::{Record, Value};
//! use kvquery_storage::{
//!     BatchMode, BatchOp, BatchOutput, DatabaseConfig, InMemoryBackend, StorageBackend,
//!     TableSchema,
//! };
//!
//! # tokio_test_block(async {
//! let backend = InMemoryBackend::open(
//!     DatabaseConfig::new("app").table(TableSchema::new("notes").auto_increment(true)),
//! )
//! .unwrap();
//!
//! let outputs = backend
//!     .run_batch(
//!         "notes",
//!         BatchMode::ReadWrite,
//!         vec![BatchOp::Add(Record::new().with("text", "hello"))],
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(outputs, vec![BatchOutput::Key(Value::Integer(1))]);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
mod schema;

pub use backend::{BatchMode, BatchOp, BatchOutput, Direction, RecordCursor, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryBackend;
pub use schema::{DatabaseConfig, IndexSchema, TableSchema};
