//! Storage backend trait definition.

use crate::error::StorageResult;
use crate::schema::TableSchema;
use async_trait::async_trait;
use kvquery_codec::{Record, Value};
use serde::{Deserialize, Serialize};

/// Traversal order of a cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending key order.
    #[default]
    Forward,
    /// Descending key order.
    Reverse,
}

/// Whether a batch may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Only `Count` is accepted.
    ReadOnly,
    /// Every operation is accepted.
    ReadWrite,
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Insert a record. Fails if its key already exists.
    Add(Record),
    /// Insert or replace a record by key.
    Put(Record),
    /// Remove the record with this key. Absent keys are not an error.
    Delete(Value),
    /// Remove every record.
    Clear,
    /// Count the records.
    Count,
}

impl BatchOp {
    /// Returns true if this operation modifies the table.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, BatchOp::Count)
    }
}

/// Result of one batch operation, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutput {
    /// Key of the record written by `Add` or `Put`.
    Key(Value),
    /// Result of `Count`.
    Count(usize),
    /// `Delete` or `Clear` completed.
    Done,
}

/// A resumable, forward-only traversal over one table.
///
/// Dropping a cursor abandons the traversal; no further records are
/// produced or decoded.
#[async_trait]
pub trait RecordCursor: Send {
    /// Returns the next record, or `None` when the traversal is done.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection closed mid-traversal or the
    /// stored record cannot be decoded.
    async fn next(&mut self) -> StorageResult<Option<Record>>;

    /// Skips `count` records without materializing them.
    ///
    /// Skipping past the end leaves the cursor exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection closed mid-traversal.
    async fn advance(&mut self, count: usize) -> StorageResult<()>;
}

/// A transactional, key-ordered record store.
///
/// This is everything the query layer needs from a storage engine: an
/// ordered cursor, a point lookup, and an atomic batch. Opening,
/// closing, and schema changes are the backend's own business.
///
/// # Invariants
///
/// - Cursors yield records in the table's natural key order, or the
///   reverse of it
/// - A batch either applies every operation or none of them
/// - Records returned by reads never alias stored state
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns true while the connection is open.
    fn is_open(&self) -> bool;

    /// Returns the schema of `table`.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed or the table does not exist.
    async fn table_schema(&self, table: &str) -> StorageResult<TableSchema>;

    /// Opens a fresh cursor over `table`.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed or the table does not exist.
    async fn open_cursor(
        &self,
        table: &str,
        direction: Direction,
    ) -> StorageResult<Box<dyn RecordCursor>>;

    /// Looks up one record by key.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed, the table does not exist, or
    /// `key` is not a valid key.
    async fn get(&self, table: &str, key: &Value) -> StorageResult<Option<Record>>;

    /// Runs `ops` against `table` as one atomic unit.
    ///
    /// On success the outputs are in submission order. On failure no
    /// operation has been applied.
    ///
    /// # Errors
    ///
    /// Fails with the first error any operation hits, or `ReadOnly` if a
    /// write is submitted with [`BatchMode::ReadOnly`].
    async fn run_batch(
        &self,
        table: &str,
        mode: BatchMode,
        ops: Vec<BatchOp>,
    ) -> StorageResult<Vec<BatchOutput>>;
}
