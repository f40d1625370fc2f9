//! Query engine: reads, conditional finds and batched writes.

use crate::condition::{self, Condition};
use crate::connection::Connection;
use crate::error::{CoreError, CoreResult};
use crate::options::{paginate, QueryOptions};
use crate::reader::SequenceReader;
use kvquery_codec::{Record, Value};
use kvquery_storage::{BatchMode, BatchOp, BatchOutput, Direction};
use tracing::{debug, warn};

/// Table-level reads and writes over one connection.
///
/// Every write is submitted as a single atomic batch: either all of its
/// records land or none do. Conditional updates and deletes resolve their
/// targets with [`QueryEngine::find`] first and then write in a separate
/// batch.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    conn: Connection,
    reader: SequenceReader,
}

impl QueryEngine {
    /// Creates an engine over `conn`.
    pub fn new(conn: Connection, default_direction: Direction) -> Self {
        let reader = SequenceReader::new(conn.clone(), default_direction);
        Self { conn, reader }
    }

    /// Returns the sequence reader this engine reads through.
    pub fn reader(&self) -> &SequenceReader {
        &self.reader
    }

    /// Reads `table` in key order with optional pagination.
    ///
    /// # Errors
    ///
    /// See [`SequenceReader::read`].
    pub async fn get_all(&self, table: &str, options: QueryOptions) -> CoreResult<Vec<Record>> {
        self.reader.read(table, options).await
    }

    /// Looks up one record by key. A missing record is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed, the table is absent, or `key`
    /// is not a valid key.
    pub async fn get(&self, table: &str, key: &Value) -> CoreResult<Option<Record>> {
        self.conn.ensure_open()?;
        let record = self
            .conn
            .backend()
            .get(table, key)
            .await
            .map_err(|e| CoreError::from_storage(table, e))?;
        debug!(table, found = record.is_some(), "point lookup");
        Ok(record)
    }

    /// Returns the records matching `condition`.
    ///
    /// The whole table is scanned in the requested direction, filtered,
    /// and only then sliced by `offset` and `limit`, so pagination counts
    /// matches rather than scanned records.
    ///
    /// # Errors
    ///
    /// See [`SequenceReader::read`].
    pub async fn find(
        &self,
        table: &str,
        condition: &Condition,
        options: QueryOptions,
    ) -> CoreResult<Vec<Record>> {
        let scanned = self.reader.read(table, options.unpaginated()).await?;
        let scanned_count = scanned.len();
        let matched = condition::filter(scanned, condition);
        let page = paginate(matched, options.offset, options.limit);
        debug!(table, scanned = scanned_count, returned = page.len(), "find");
        Ok(page)
    }

    /// Counts every record in `table`.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed, the table is absent, or the
    /// store rejects the read.
    pub async fn count(&self, table: &str) -> CoreResult<usize> {
        let outputs = self
            .run_batch(table, BatchMode::ReadOnly, vec![BatchOp::Count])
            .await?;
        let count = outputs
            .into_iter()
            .find_map(|output| match output {
                BatchOutput::Count(n) => Some(n),
                _ => None,
            })
            .unwrap_or(0);
        debug!(table, count, "count");
        Ok(count)
    }

    /// Inserts one record and returns its key.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if the key already exists or the
    /// store rejects the write.
    pub async fn insert(&self, table: &str, record: Record) -> CoreResult<Value> {
        let mut keys = self.insert_many(table, vec![record]).await?;
        keys.pop().ok_or_else(|| {
            CoreError::invalid_operation(format!("insert into {table} returned no key"))
        })
    }

    /// Inserts every record in one atomic batch.
    ///
    /// Returns the keys in input order. Any failure, including a
    /// duplicate key, rejects the whole batch. Existing records are
    /// never overwritten.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if the store rejects the batch.
    pub async fn insert_many(&self, table: &str, records: Vec<Record>) -> CoreResult<Vec<Value>> {
        if records.is_empty() {
            self.conn.ensure_open()?;
            return Ok(Vec::new());
        }
        let ops = records.into_iter().map(BatchOp::Add).collect();
        let keys = written_keys(self.run_batch(table, BatchMode::ReadWrite, ops).await?);
        debug!(table, inserted = keys.len(), "insert");
        Ok(keys)
    }

    /// Replaces (or creates) one record by its key.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if the store rejects the write.
    pub async fn update(&self, table: &str, record: Record) -> CoreResult<Value> {
        let mut keys = self.update_many(table, vec![record]).await?;
        keys.pop().ok_or_else(|| {
            CoreError::invalid_operation(format!("update of {table} returned no key"))
        })
    }

    /// Replaces (or creates) every record by key in one atomic batch.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if the store rejects the batch.
    pub async fn update_many(&self, table: &str, records: Vec<Record>) -> CoreResult<Vec<Value>> {
        if records.is_empty() {
            self.conn.ensure_open()?;
            return Ok(Vec::new());
        }
        let ops = records.into_iter().map(BatchOp::Put).collect();
        let keys = written_keys(self.run_batch(table, BatchMode::ReadWrite, ops).await?);
        debug!(table, updated = keys.len(), "update");
        Ok(keys)
    }

    /// Merges `partial` onto every record matching `condition`.
    ///
    /// Fields in `partial` win. The key path is never rewritten: each
    /// merged record keeps its own key. Returns the number of records
    /// updated; with no matches nothing is written.
    ///
    /// # Errors
    ///
    /// Fails if the find fails or the store rejects the batch.
    pub async fn update_where(
        &self,
        table: &str,
        condition: &Condition,
        partial: &Record,
    ) -> CoreResult<usize> {
        let matched = self.find(table, condition, QueryOptions::new()).await?;
        if matched.is_empty() {
            debug!(table, "update_where matched nothing");
            return Ok(0);
        }

        let key_path = self.key_path(table).await?;
        let ops: Vec<BatchOp> = matched
            .iter()
            .map(|existing| {
                let mut merged = partial.merged_with(existing);
                if let Some(key) = existing.get(&key_path) {
                    merged.set(key_path.as_str(), key.clone());
                }
                BatchOp::Put(merged)
            })
            .collect();
        let updated = ops.len();

        self.run_batch(table, BatchMode::ReadWrite, ops).await?;
        debug!(table, updated, "update_where");
        Ok(updated)
    }

    /// Deletes one record by key. An absent key is not an error.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if the store rejects the delete.
    pub async fn delete(&self, table: &str, key: Value) -> CoreResult<()> {
        self.delete_many(table, vec![key]).await
    }

    /// Deletes every key in one atomic batch. Absent keys are skipped.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if the store rejects the batch.
    pub async fn delete_many(&self, table: &str, keys: Vec<Value>) -> CoreResult<()> {
        if keys.is_empty() {
            self.conn.ensure_open()?;
            return Ok(());
        }
        let count = keys.len();
        let ops = keys.into_iter().map(BatchOp::Delete).collect();
        self.run_batch(table, BatchMode::ReadWrite, ops).await?;
        debug!(table, deleted = count, "delete");
        Ok(())
    }

    /// Deletes every record matching `condition` and returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Fails if the find fails or the store rejects the batch.
    pub async fn delete_where(&self, table: &str, condition: &Condition) -> CoreResult<usize> {
        let matched = self.find(table, condition, QueryOptions::new()).await?;
        if matched.is_empty() {
            debug!(table, "delete_where matched nothing");
            return Ok(0);
        }

        let key_path = self.key_path(table).await?;
        let keys: Vec<Value> = matched
            .into_iter()
            .filter_map(|mut record| record.remove(&key_path))
            .collect();
        let removed = keys.len();

        self.delete_many(table, keys).await?;
        debug!(table, removed, "delete_where");
        Ok(removed)
    }

    /// Removes every record in `table`. Clearing an empty table is fine.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if the store rejects the clear.
    pub async fn clear(&self, table: &str) -> CoreResult<()> {
        self.run_batch(table, BatchMode::ReadWrite, vec![BatchOp::Clear])
            .await?;
        debug!(table, "cleared");
        Ok(())
    }

    async fn key_path(&self, table: &str) -> CoreResult<String> {
        self.conn.ensure_open()?;
        let schema = self
            .conn
            .backend()
            .table_schema(table)
            .await
            .map_err(|e| CoreError::from_storage(table, e))?;
        Ok(schema.key_path)
    }

    async fn run_batch(
        &self,
        table: &str,
        mode: BatchMode,
        ops: Vec<BatchOp>,
    ) -> CoreResult<Vec<BatchOutput>> {
        self.conn.ensure_open()?;
        let size = ops.len();
        self.conn
            .backend()
            .run_batch(table, mode, ops)
            .await
            .map_err(|e| {
                warn!(table, ops = size, error = %e, "batch rejected");
                CoreError::from_storage(table, e)
            })
    }
}

fn written_keys(outputs: Vec<BatchOutput>) -> Vec<Value> {
    outputs
        .into_iter()
        .filter_map(|output| match output {
            BatchOutput::Key(key) => Some(key),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::OperatorSet;
    use kvquery_storage::{DatabaseConfig, InMemoryBackend, IndexSchema, StorageError, TableSchema};
    use std::sync::Arc;

    fn open() -> (InMemoryBackend, QueryEngine) {
        let backend = InMemoryBackend::open(
            DatabaseConfig::new("test")
                .table(TableSchema::new("items").auto_increment(true))
                .table(
                    TableSchema::new("users")
                        .key_path("email")
                        .index(IndexSchema::new("by_handle", "handle").unique(true)),
                ),
        )
        .unwrap();
        let engine = QueryEngine::new(
            Connection::new(Arc::new(backend.clone())),
            Direction::Forward,
        );
        (backend, engine)
    }

    fn item(value: i64, name: &str) -> Record {
        Record::new().with("value", value).with("name", name)
    }

    #[tokio::test]
    async fn insert_assigns_keys_in_order() {
        let (_backend, engine) = open();
        let keys = engine
            .insert_many("items", vec![item(1, "a"), item(2, "b"), item(3, "c")])
            .await
            .unwrap();
        assert_eq!(keys, vec![Value::from(1), Value::from(2), Value::from(3)]);

        let key = engine.insert("items", item(4, "d")).await.unwrap();
        assert_eq!(key, Value::from(4));
        assert_eq!(engine.count("items").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn insert_never_overwrites() {
        let (_backend, engine) = open();
        let user = Record::new().with("email", "a@x").with("name", "A");
        engine.insert("users", user.clone()).await.unwrap();

        let err = engine
            .insert("users", user.clone().with("name", "B"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TransactionFailed { .. }));

        let stored = engine.get("users", &Value::from("a@x")).await.unwrap();
        assert_eq!(stored, Some(user));
    }

    #[tokio::test]
    async fn duplicate_in_batch_rejects_everything() {
        let (_backend, engine) = open();
        engine
            .insert("users", Record::new().with("email", "a@x"))
            .await
            .unwrap();

        let err = engine
            .insert_many(
                "users",
                vec![
                    Record::new().with("email", "b@x"),
                    Record::new().with("email", "a@x"),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::TransactionFailed {
                source: StorageError::ConstraintViolation { .. },
                ..
            }
        ));
        assert_eq!(engine.count("users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unique_index_violation_is_a_failed_transaction() {
        let (_backend, engine) = open();
        let err = engine
            .insert_many(
                "users",
                vec![
                    Record::new().with("email", "a@x").with("handle", "al"),
                    Record::new().with("email", "b@x").with("handle", "al"),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TransactionFailed { table, .. } if table == "users"));
        assert_eq!(engine.count("users").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_batches_write_nothing() {
        let (_backend, engine) = open();
        assert!(engine.insert_many("items", vec![]).await.unwrap().is_empty());
        assert!(engine.update_many("items", vec![]).await.unwrap().is_empty());
        engine.delete_many("items", vec![]).await.unwrap();
        assert_eq!(engine.count("items").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let (_backend, engine) = open();
        assert_eq!(engine.get("items", &Value::from(9)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_paginates_matches() {
        let (_backend, engine) = open();
        let records = (1..=10).map(|v| item(v, if v % 2 == 0 { "even" } else { "odd" }));
        engine.insert_many("items", records.collect()).await.unwrap();

        let evens = Condition::new().equals("name", "even");
        let page = engine
            .find("items", &evens, QueryOptions::new().offset(1).limit(2))
            .await
            .unwrap();
        let values: Vec<_> = page.iter().map(|r| r.get_or_null("value").clone()).collect();
        assert_eq!(values, vec![Value::from(4), Value::from(6)]);

        let reversed = engine
            .find("items", &evens, QueryOptions::new().reverse().limit(1))
            .await
            .unwrap();
        assert_eq!(reversed[0].get("value"), Some(&Value::from(10)));
    }

    #[tokio::test]
    async fn find_with_operators() {
        let (_backend, engine) = open();
        let ages = [25, 30, 20, 35, 28];
        engine
            .insert_many("items", ages.iter().map(|&a| item(a, "p")).collect())
            .await
            .unwrap();

        let over_30 = Condition::new().with_ops("value", OperatorSet::new().gt(30));
        assert_eq!(
            engine.find("items", &over_30, QueryOptions::new()).await.unwrap().len(),
            1
        );

        let at_most_25 = Condition::new().with_ops("value", OperatorSet::new().lte(25));
        assert_eq!(
            engine.find("items", &at_most_25, QueryOptions::new()).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn update_replaces_whole_record() {
        let (_backend, engine) = open();
        let key = engine.insert("items", item(1, "a")).await.unwrap();

        let replacement = Record::new().with("id", key.clone()).with("value", 2);
        engine.update("items", replacement.clone()).await.unwrap();

        let stored = engine.get("items", &key).await.unwrap().unwrap();
        assert_eq!(stored, replacement);
        assert!(!stored.contains("name"));
    }

    #[tokio::test]
    async fn update_where_merges_matches_only() {
        let (_backend, engine) = open();
        engine
            .insert_many("items", vec![item(10, "a"), item(10, "b"), item(20, "c")])
            .await
            .unwrap();

        let updated = engine
            .update_where(
                "items",
                &Condition::new().equals("value", 10),
                &Record::new().with("value", 50).with("name", "X"),
            )
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let all = engine.get_all("items", QueryOptions::new()).await.unwrap();
        assert_eq!(all[0], item(50, "X").with("id", 1));
        assert_eq!(all[1], item(50, "X").with("id", 2));
        assert_eq!(all[2], item(20, "c").with("id", 3));
    }

    #[tokio::test]
    async fn update_where_keeps_key() {
        let (_backend, engine) = open();
        engine.insert("items", item(1, "a")).await.unwrap();

        engine
            .update_where(
                "items",
                &Condition::new(),
                &Record::new().with("id", 99).with("name", "b"),
            )
            .await
            .unwrap();

        let all = engine.get_all("items", QueryOptions::new()).await.unwrap();
        assert_eq!(all, vec![item(1, "b").with("id", 1)]);
    }

    #[tokio::test]
    async fn update_where_without_matches_is_zero() {
        let (_backend, engine) = open();
        engine.insert("items", item(1, "a")).await.unwrap();
        let updated = engine
            .update_where(
                "items",
                &Condition::new().equals("value", 7),
                &Record::new().with("name", "z"),
            )
            .await
            .unwrap();
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    async fn delete_and_delete_where() {
        let (_backend, engine) = open();
        engine
            .insert_many("items", (1..=6).map(|v| item(v, "x")).collect())
            .await
            .unwrap();

        engine.delete("items", Value::from(1)).await.unwrap();
        engine.delete("items", Value::from(42)).await.unwrap();
        assert_eq!(engine.count("items").await.unwrap(), 5);

        let removed = engine
            .delete_where("items", &Condition::new().with_ops("value", OperatorSet::new().gte(4)))
            .await
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(engine.count("items").await.unwrap(), 2);

        let none = engine
            .delete_where("items", &Condition::new().equals("value", 100))
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (_backend, engine) = open();
        engine
            .insert_many("items", vec![item(1, "a"), item(2, "b")])
            .await
            .unwrap();
        engine.clear("items").await.unwrap();
        assert_eq!(engine.count("items").await.unwrap(), 0);
        engine.clear("items").await.unwrap();
        assert_eq!(engine.count("items").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_table() {
        let (_backend, engine) = open();
        let err = engine.count("ghost").await.unwrap_err();
        assert!(matches!(err, CoreError::TableNotFound { name } if name == "ghost"));
        let err = engine.insert("ghost", item(1, "a")).await.unwrap_err();
        assert!(matches!(err, CoreError::TableNotFound { .. }));
    }

    #[tokio::test]
    async fn closed_connection_mutates_nothing() {
        let (backend, engine) = open();
        engine.insert("items", item(1, "a")).await.unwrap();
        engine.conn.close();

        assert!(engine.insert("items", item(2, "b")).await.unwrap_err().is_unavailable());
        assert!(engine.clear("items").await.unwrap_err().is_unavailable());
        assert!(engine
            .delete_where("items", &Condition::new())
            .await
            .unwrap_err()
            .is_unavailable());

        let fresh = QueryEngine::new(Connection::new(Arc::new(backend)), Direction::Forward);
        assert_eq!(fresh.count("items").await.unwrap(), 1);
    }
}
