//! Sequence reader: ordered, paginated table reads over a cursor.

use crate::connection::Connection;
use crate::error::{CoreError, CoreResult};
use crate::options::QueryOptions;
use kvquery_codec::Record;
use kvquery_storage::Direction;
use tracing::debug;

/// Reads records from one table in key order.
///
/// Every read opens a fresh cursor, so concurrent reads never share
/// traversal state.
#[derive(Debug, Clone)]
pub struct SequenceReader {
    conn: Connection,
    default_direction: Direction,
}

impl SequenceReader {
    /// Creates a reader over `conn`.
    pub fn new(conn: Connection, default_direction: Direction) -> Self {
        Self {
            conn,
            default_direction,
        }
    }

    /// Reads `table` according to `options`.
    ///
    /// Offset records are skipped with the cursor's `advance` and never
    /// decoded. Once `limit` records are collected the cursor is dropped.
    ///
    /// # Errors
    ///
    /// [`CoreError::StoreUnavailable`] if the connection is closed,
    /// [`CoreError::TableNotFound`] if the table is absent, and
    /// [`CoreError::TransactionFailed`] if the traversal fails.
    pub async fn read(&self, table: &str, options: QueryOptions) -> CoreResult<Vec<Record>> {
        self.conn.ensure_open()?;
        let direction = options.direction.unwrap_or(self.default_direction);

        let mut cursor = self
            .conn
            .backend()
            .open_cursor(table, direction)
            .await
            .map_err(|e| CoreError::from_storage(table, e))?;

        let limit = options.limit.unwrap_or(usize::MAX);
        if limit == 0 {
            debug!(table, "read with zero limit");
            return Ok(Vec::new());
        }

        if let Some(offset) = options.offset.filter(|&n| n > 0) {
            cursor
                .advance(offset)
                .await
                .map_err(|e| CoreError::from_storage(table, e))?;
        }

        let mut records = Vec::new();
        while records.len() < limit {
            match cursor
                .next()
                .await
                .map_err(|e| CoreError::from_storage(table, e))?
            {
                Some(record) => records.push(record),
                None => break,
            }
        }

        debug!(table, ?direction, count = records.len(), "read records");
        Ok(records)
    }
}
