//! In-memory transactional object store.

use crate::backend::{BatchMode, BatchOp, BatchOutput, Direction, RecordCursor, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::schema::{DatabaseConfig, TableSchema};
use async_trait::async_trait;
use kvquery_codec::{decode_record, encode_record, Record, Value};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, trace};

/// A key ordered by [`Value::cmp_key`].
#[derive(Debug, Clone)]
struct StoreKey(Value);

impl PartialEq for StoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StoreKey {}

impl PartialOrd for StoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_key(&other.0)
    }
}

type IndexEntries = BTreeMap<StoreKey, StoreKey>;

/// One reversible change made by the batch in flight.
#[derive(Debug)]
enum Undo {
    Row {
        key: StoreKey,
        previous: Option<Arc<[u8]>>,
    },
    Index {
        name: String,
        value: StoreKey,
        previous: Option<StoreKey>,
    },
    Clear {
        rows: BTreeMap<StoreKey, Arc<[u8]>>,
        unique: HashMap<String, IndexEntries>,
    },
}

/// One object store: encoded records by key, plus unique-index entries.
#[derive(Debug)]
struct MemTable {
    schema: TableSchema,
    rows: BTreeMap<StoreKey, Arc<[u8]>>,
    /// Next generated key. Never reset, not even by `clear`.
    next_key: i64,
    /// Unique index name -> indexed value -> owning record key.
    unique: HashMap<String, IndexEntries>,
}

impl MemTable {
    fn new(schema: TableSchema) -> Self {
        let unique = schema
            .indexes
            .iter()
            .filter(|index| index.unique)
            .map(|index| (index.name.clone(), BTreeMap::new()))
            .collect();
        Self {
            schema,
            rows: BTreeMap::new(),
            next_key: 1,
            unique,
        }
    }

    fn check_key(&self, key: &Value) -> StorageResult<()> {
        if key.is_valid_key() {
            Ok(())
        } else {
            Err(StorageError::InvalidKey {
                table: self.schema.name.clone(),
                type_name: key.type_name(),
            })
        }
    }

    /// Resolves the record's key, generating one if the table allows it.
    fn resolve_key(&mut self, record: &mut Record) -> StorageResult<Value> {
        if let Some(key) = record.get(&self.schema.key_path) {
            self.check_key(key)?;
            let key = key.clone();
            if self.schema.auto_increment {
                if let Value::Integer(n) = key {
                    if n >= self.next_key {
                        self.next_key = n.saturating_add(1);
                    }
                }
            }
            return Ok(key);
        }

        if !self.schema.auto_increment {
            return Err(StorageError::MissingKey {
                table: self.schema.name.clone(),
                key_path: self.schema.key_path.clone(),
            });
        }

        let key = Value::Integer(self.next_key);
        self.next_key = self.next_key.saturating_add(1);
        record.set(self.schema.key_path.clone(), key.clone());
        Ok(key)
    }

    fn write(
        &mut self,
        mut record: Record,
        overwrite: bool,
        undo: &mut Vec<Undo>,
    ) -> StorageResult<Value> {
        let key = self.resolve_key(&mut record)?;
        let store_key = StoreKey(key.clone());

        if let Some(bytes) = self.rows.get(&store_key).cloned() {
            if !overwrite {
                return Err(StorageError::constraint_violation(
                    &self.schema.name,
                    format!("key {key:?} already exists"),
                ));
            }
            let previous = decode_record(&bytes)?;
            self.unindex(&store_key, &previous, undo);
        }

        self.index(&store_key, &record, undo)?;
        let bytes = encode_record(&record)?;
        let previous = self.rows.insert(store_key.clone(), bytes.into());
        undo.push(Undo::Row {
            key: store_key,
            previous,
        });
        Ok(key)
    }

    fn index(
        &mut self,
        key: &StoreKey,
        record: &Record,
        undo: &mut Vec<Undo>,
    ) -> StorageResult<()> {
        for index in self.schema.indexes.iter().filter(|index| index.unique) {
            let Some(value) = record.get(&index.field).filter(|v| v.is_valid_key()) else {
                continue;
            };
            let entries = self.unique.entry(index.name.clone()).or_default();
            let indexed = StoreKey(value.clone());
            if entries.get(&indexed).is_some_and(|owner| owner != key) {
                return Err(StorageError::constraint_violation(
                    &self.schema.name,
                    format!("unique index {} already holds {value:?}", index.name),
                ));
            }
            let previous = entries.insert(indexed.clone(), key.clone());
            undo.push(Undo::Index {
                name: index.name.clone(),
                value: indexed,
                previous,
            });
        }
        Ok(())
    }

    fn unindex(&mut self, key: &StoreKey, record: &Record, undo: &mut Vec<Undo>) {
        for index in self.schema.indexes.iter().filter(|index| index.unique) {
            let Some(value) = record.get(&index.field) else {
                continue;
            };
            if let Some(entries) = self.unique.get_mut(&index.name) {
                let indexed = StoreKey(value.clone());
                if entries.get(&indexed) == Some(key) {
                    let previous = entries.remove(&indexed);
                    undo.push(Undo::Index {
                        name: index.name.clone(),
                        value: indexed,
                        previous,
                    });
                }
            }
        }
    }

    fn delete(&mut self, key: &Value, undo: &mut Vec<Undo>) -> StorageResult<()> {
        self.check_key(key)?;
        let store_key = StoreKey(key.clone());
        if let Some(bytes) = self.rows.remove(&store_key) {
            undo.push(Undo::Row {
                key: store_key.clone(),
                previous: Some(Arc::clone(&bytes)),
            });
            let previous = decode_record(&bytes)?;
            self.unindex(&store_key, &previous, undo);
        }
        Ok(())
    }

    fn clear(&mut self, undo: &mut Vec<Undo>) {
        let rows = std::mem::take(&mut self.rows);
        let unique = self
            .unique
            .iter_mut()
            .map(|(name, entries)| (name.clone(), std::mem::take(entries)))
            .collect();
        undo.push(Undo::Clear { rows, unique });
    }

    fn apply(&mut self, op: BatchOp, undo: &mut Vec<Undo>) -> StorageResult<BatchOutput> {
        match op {
            BatchOp::Add(record) => self.write(record, false, undo).map(BatchOutput::Key),
            BatchOp::Put(record) => self.write(record, true, undo).map(BatchOutput::Key),
            BatchOp::Delete(key) => self.delete(&key, undo).map(|()| BatchOutput::Done),
            BatchOp::Clear => {
                self.clear(undo);
                Ok(BatchOutput::Done)
            }
            BatchOp::Count => Ok(BatchOutput::Count(self.rows.len())),
        }
    }

    /// Reverts `undo`, newest change first, and restores the key
    /// generator.
    fn rollback(&mut self, next_key: i64, undo: Vec<Undo>) {
        for change in undo.into_iter().rev() {
            match change {
                Undo::Row {
                    key,
                    previous: Some(bytes),
                } => {
                    self.rows.insert(key, bytes);
                }
                Undo::Row {
                    key,
                    previous: None,
                } => {
                    self.rows.remove(&key);
                }
                Undo::Index {
                    name,
                    value,
                    previous,
                } => {
                    let entries = self.unique.entry(name).or_default();
                    match previous {
                        Some(owner) => entries.insert(value, owner),
                        None => entries.remove(&value),
                    };
                }
                Undo::Clear { rows, unique } => {
                    self.rows = rows;
                    self.unique = unique;
                }
            }
        }
        self.next_key = next_key;
    }
}

#[derive(Debug)]
struct State {
    version: u32,
    tables: HashMap<String, MemTable>,
}

#[derive(Debug)]
struct Shared {
    name: String,
    open: AtomicBool,
    state: RwLock<State>,
}

impl Shared {
    fn ensure_open(&self) -> StorageResult<()> {
        if self.open.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Closed)
        }
    }
}

/// An in-memory, transactional, key-ordered object store.
///
/// This backend behaves like a browser object store:
/// - Each table keeps its records in natural key order
/// - Keys come from the table's key path, or from a per-table counter
///   when the table is auto-incrementing
/// - Unique indexes are enforced on write
/// - Every batch is all-or-nothing: operations apply in place under the
///   write lock, and an undo log reverts them if any operation fails
///
/// Records are held as CBOR bytes, so nothing handed out by a read
/// aliases stored state.
///
/// Cloning the backend yields another handle to the same database;
/// closing any handle closes them all.
///
/// # Example
///
/// ```rust
/// use kvquery_storage::{DatabaseConfig, InMemoryBackend, TableSchema};
///
/// let backend = InMemoryBackend::open(
///     DatabaseConfig::new("app").table(TableSchema::new("users").auto_increment(true)),
/// )
/// .unwrap();
/// assert_eq!(backend.table_names(), vec!["users".to_string()]);
/// backend.close();
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
}

impl InMemoryBackend {
    /// Opens a database with the tables described by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid.
    pub fn open(config: DatabaseConfig) -> StorageResult<Self> {
        config.validate()?;

        let tables = config
            .tables
            .into_iter()
            .map(|schema| (schema.name.clone(), MemTable::new(schema)))
            .collect::<HashMap<_, _>>();

        debug!(
            database = %config.name,
            version = config.version,
            tables = tables.len(),
            "opened in-memory database"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                name: config.name,
                open: AtomicBool::new(true),
                state: RwLock::new(State {
                    version: config.version,
                    tables,
                }),
            }),
        })
    }

    /// Closes the connection. Stored data is kept.
    pub fn close(&self) {
        self.shared.open.store(false, AtomicOrdering::SeqCst);
        debug!(database = %self.shared.name, "closed in-memory database");
    }

    /// Reopens a closed connection.
    pub fn reopen(&self) {
        self.shared.open.store(true, AtomicOrdering::SeqCst);
        debug!(database = %self.shared.name, "reopened in-memory database");
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the schema version. Every schema change bumps it.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.shared.state.read().version
    }

    /// Returns the table names, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.shared.state.read().tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed, the schema is invalid, or the
    /// table already exists.
    pub fn create_table(&self, schema: TableSchema) -> StorageResult<()> {
        self.shared.ensure_open()?;
        schema.validate()?;

        let mut state = self.shared.state.write();
        if state.tables.contains_key(&schema.name) {
            return Err(StorageError::table_exists(&schema.name));
        }
        state.version += 1;
        debug!(table = %schema.name, version = state.version, "created table");
        state
            .tables
            .insert(schema.name.clone(), MemTable::new(schema));
        Ok(())
    }

    /// Drops a table and every record in it.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed or the table does not exist.
    pub fn drop_table(&self, name: &str) -> StorageResult<()> {
        self.shared.ensure_open()?;

        let mut state = self.shared.state.write();
        if state.tables.remove(name).is_none() {
            return Err(StorageError::table_not_found(name));
        }
        state.version += 1;
        debug!(table = %name, version = state.version, "dropped table");
        Ok(())
    }

    fn schema_of(&self, table: &str) -> StorageResult<TableSchema> {
        self.shared.ensure_open()?;
        self.shared
            .state
            .read()
            .tables
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| StorageError::table_not_found(table))
    }

    fn snapshot(&self, table: &str, direction: Direction) -> StorageResult<MemCursor> {
        self.shared.ensure_open()?;
        let state = self.shared.state.read();
        let mem = state
            .tables
            .get(table)
            .ok_or_else(|| StorageError::table_not_found(table))?;

        let rows: Vec<Arc<[u8]>> = match direction {
            Direction::Forward => mem.rows.values().cloned().collect(),
            Direction::Reverse => mem.rows.values().rev().cloned().collect(),
        };

        Ok(MemCursor {
            rows: rows.into_iter(),
            shared: Arc::clone(&self.shared),
        })
    }

    fn lookup(&self, table: &str, key: &Value) -> StorageResult<Option<Record>> {
        self.shared.ensure_open()?;
        let state = self.shared.state.read();
        let mem = state
            .tables
            .get(table)
            .ok_or_else(|| StorageError::table_not_found(table))?;
        mem.check_key(key)?;

        match mem.rows.get(&StoreKey(key.clone())) {
            Some(bytes) => Ok(Some(decode_record(bytes)?)),
            None => Ok(None),
        }
    }

    fn commit(
        &self,
        table: &str,
        mode: BatchMode,
        ops: Vec<BatchOp>,
    ) -> StorageResult<Vec<BatchOutput>> {
        self.shared.ensure_open()?;

        if mode == BatchMode::ReadOnly && ops.iter().any(BatchOp::is_write) {
            return Err(StorageError::ReadOnly {
                table: table.to_string(),
            });
        }

        if mode == BatchMode::ReadOnly {
            let state = self.shared.state.read();
            let count = state
                .tables
                .get(table)
                .ok_or_else(|| StorageError::table_not_found(table))?
                .rows
                .len();
            return Ok(ops.iter().map(|_| BatchOutput::Count(count)).collect());
        }

        let mut state = self.shared.state.write();
        let mem = state
            .tables
            .get_mut(table)
            .ok_or_else(|| StorageError::table_not_found(table))?;

        let op_count = ops.len();
        let next_key = mem.next_key;
        let mut undo = Vec::new();
        let mut outputs = Vec::with_capacity(op_count);
        for op in ops {
            match mem.apply(op, &mut undo) {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    trace!(table = %table, changes = undo.len(), "rolling back batch");
                    mem.rollback(next_key, undo);
                    return Err(e);
                }
            }
        }

        trace!(table = %table, ops = op_count, rows = mem.rows.len(), "committed batch");
        Ok(outputs)
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn is_open(&self) -> bool {
        self.shared.open.load(AtomicOrdering::SeqCst)
    }

    async fn table_schema(&self, table: &str) -> StorageResult<TableSchema> {
        self.schema_of(table)
    }

    async fn open_cursor(
        &self,
        table: &str,
        direction: Direction,
    ) -> StorageResult<Box<dyn RecordCursor>> {
        Ok(Box::new(self.snapshot(table, direction)?))
    }

    async fn get(&self, table: &str, key: &Value) -> StorageResult<Option<Record>> {
        self.lookup(table, key)
    }

    async fn run_batch(
        &self,
        table: &str,
        mode: BatchMode,
        ops: Vec<BatchOp>,
    ) -> StorageResult<Vec<BatchOutput>> {
        self.commit(table, mode, ops)
    }
}

/// Cursor over a snapshot of one table taken when it was opened.
struct MemCursor {
    rows: std::vec::IntoIter<Arc<[u8]>>,
    shared: Arc<Shared>,
}

#[async_trait]
impl RecordCursor for MemCursor {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        self.shared.ensure_open()?;
        match self.rows.next() {
            Some(bytes) => Ok(Some(decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn advance(&mut self, count: usize) -> StorageResult<()> {
        self.shared.ensure_open()?;
        if count > 0 {
            self.rows.nth(count - 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexSchema;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::open(
            DatabaseConfig::new("test")
                .table(TableSchema::new("items"))
                .table(TableSchema::new("auto").auto_increment(true))
                .table(
                    TableSchema::new("users")
                        .key_path("email")
                        .index(IndexSchema::new("by_handle", "handle").unique(true)),
                ),
        )
        .unwrap()
    }

    fn item(id: i64) -> Record {
        Record::new().with("id", id).with("n", id * 10)
    }

    async fn drain(cursor: &mut Box<dyn RecordCursor>) -> Vec<Value> {
        let mut keys = Vec::new();
        while let Some(record) = cursor.next().await.unwrap() {
            keys.push(record.get("id").cloned().unwrap());
        }
        keys
    }

    async fn seed(backend: &InMemoryBackend, ids: &[i64]) {
        let ops = ids.iter().map(|&id| BatchOp::Add(item(id))).collect();
        backend
            .run_batch("items", BatchMode::ReadWrite, ops)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cursor_follows_key_order() {
        let backend = backend();
        seed(&backend, &[3, 1, 2]).await;

        let mut forward = backend.open_cursor("items", Direction::Forward).await.unwrap();
        assert_eq!(
            drain(&mut forward).await,
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );

        let mut reverse = backend.open_cursor("items", Direction::Reverse).await.unwrap();
        assert_eq!(
            drain(&mut reverse).await,
            vec![Value::Integer(3), Value::Integer(2), Value::Integer(1)]
        );
    }

    #[tokio::test]
    async fn cursor_advance_skips() {
        let backend = backend();
        seed(&backend, &[1, 2, 3, 4]).await;

        let mut cursor = backend.open_cursor("items", Direction::Forward).await.unwrap();
        cursor.advance(2).await.unwrap();
        assert_eq!(drain(&mut cursor).await, vec![Value::Integer(3), Value::Integer(4)]);

        let mut cursor = backend.open_cursor("items", Direction::Forward).await.unwrap();
        cursor.advance(10).await.unwrap();
        assert!(cursor.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cursor_fails_after_close() {
        let backend = backend();
        seed(&backend, &[1, 2]).await;

        let mut cursor = backend.open_cursor("items", Direction::Forward).await.unwrap();
        assert!(cursor.next().await.unwrap().is_some());
        backend.close();
        assert_eq!(cursor.next().await, Err(StorageError::Closed));
    }

    #[tokio::test]
    async fn cursor_is_a_snapshot() {
        let backend = backend();
        seed(&backend, &[1]).await;

        let mut cursor = backend.open_cursor("items", Direction::Forward).await.unwrap();
        seed(&backend, &[2]).await;
        assert_eq!(drain(&mut cursor).await, vec![Value::Integer(1)]);
    }

    #[tokio::test]
    async fn add_duplicate_rolls_back_whole_batch() {
        let backend = backend();
        seed(&backend, &[1]).await;

        let result = backend
            .run_batch(
                "items",
                BatchMode::ReadWrite,
                vec![BatchOp::Add(item(2)), BatchOp::Add(item(1))],
            )
            .await;
        assert!(matches!(result, Err(StorageError::ConstraintViolation { .. })));
        assert_eq!(backend.get("items", &Value::Integer(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_batch_restores_rows_indexes_and_key_generator() {
        let backend = backend();
        let user = |email: &str, handle: &str| {
            Record::new().with("email", email).with("handle", handle)
        };
        backend
            .run_batch(
                "users",
                BatchMode::ReadWrite,
                vec![BatchOp::Add(user("a@x", "al")), BatchOp::Add(user("b@x", "bo"))],
            )
            .await
            .unwrap();

        // Rename, delete, clear and re-add, then fail on a handle clash.
        let result = backend
            .run_batch(
                "users",
                BatchMode::ReadWrite,
                vec![
                    BatchOp::Put(user("a@x", "ally")),
                    BatchOp::Delete(Value::from("b@x")),
                    BatchOp::Clear,
                    BatchOp::Add(user("c@x", "cy")),
                    BatchOp::Add(user("d@x", "cy")),
                ],
            )
            .await;
        assert!(matches!(result, Err(StorageError::ConstraintViolation { .. })));

        assert_eq!(
            backend.get("users", &Value::from("a@x")).await.unwrap(),
            Some(user("a@x", "al"))
        );
        assert_eq!(
            backend.get("users", &Value::from("b@x")).await.unwrap(),
            Some(user("b@x", "bo"))
        );
        assert_eq!(backend.get("users", &Value::from("c@x")).await.unwrap(), None);

        // The old handles are still owned and the attempted ones are free.
        let clash = backend
            .run_batch("users", BatchMode::ReadWrite, vec![BatchOp::Add(user("e@x", "al"))])
            .await;
        assert!(matches!(clash, Err(StorageError::ConstraintViolation { .. })));
        backend
            .run_batch(
                "users",
                BatchMode::ReadWrite,
                vec![BatchOp::Add(user("e@x", "ally")), BatchOp::Add(user("f@x", "cy"))],
            )
            .await
            .unwrap();

        let add = || BatchOp::Add(Record::new().with("name", "a"));
        let failed = backend
            .run_batch(
                "auto",
                BatchMode::ReadWrite,
                vec![add(), add(), BatchOp::Add(Record::new().with("id", true))],
            )
            .await;
        assert!(matches!(failed, Err(StorageError::InvalidKey { .. })));
        let outputs = backend
            .run_batch("auto", BatchMode::ReadWrite, vec![add()])
            .await
            .unwrap();
        assert_eq!(outputs, vec![BatchOutput::Key(Value::Integer(1))]);
    }

    #[tokio::test]
    async fn put_replaces_record() {
        let backend = backend();
        seed(&backend, &[1]).await;

        let replacement = Record::new().with("id", 1).with("label", "x");
        backend
            .run_batch("items", BatchMode::ReadWrite, vec![BatchOp::Put(replacement.clone())])
            .await
            .unwrap();

        assert_eq!(
            backend.get("items", &Value::Integer(1)).await.unwrap(),
            Some(replacement)
        );
    }

    #[tokio::test]
    async fn auto_increment_assigns_keys_in_order() {
        let backend = backend();
        let outputs = backend
            .run_batch(
                "auto",
                BatchMode::ReadWrite,
                vec![
                    BatchOp::Add(Record::new().with("name", "a")),
                    BatchOp::Add(Record::new().with("id", 10).with("name", "b")),
                    BatchOp::Add(Record::new().with("name", "c")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            outputs,
            vec![
                BatchOutput::Key(Value::Integer(1)),
                BatchOutput::Key(Value::Integer(10)),
                BatchOutput::Key(Value::Integer(11)),
            ]
        );
        let stored = backend.get("auto", &Value::Integer(11)).await.unwrap().unwrap();
        assert_eq!(stored.get("id"), Some(&Value::Integer(11)));
    }

    #[tokio::test]
    async fn clear_keeps_key_generator() {
        let backend = backend();
        let add = || BatchOp::Add(Record::new().with("name", "a"));
        backend
            .run_batch("auto", BatchMode::ReadWrite, vec![add(), add()])
            .await
            .unwrap();
        backend
            .run_batch("auto", BatchMode::ReadWrite, vec![BatchOp::Clear])
            .await
            .unwrap();
        let outputs = backend
            .run_batch("auto", BatchMode::ReadWrite, vec![add()])
            .await
            .unwrap();
        assert_eq!(outputs, vec![BatchOutput::Key(Value::Integer(3))]);
    }

    #[tokio::test]
    async fn missing_key_without_generator_fails() {
        let backend = backend();
        let result = backend
            .run_batch(
                "items",
                BatchMode::ReadWrite,
                vec![BatchOp::Add(Record::new().with("n", 1))],
            )
            .await;
        assert!(matches!(result, Err(StorageError::MissingKey { .. })));
    }

    #[tokio::test]
    async fn invalid_key_fails() {
        let backend = backend();
        let result = backend
            .run_batch(
                "items",
                BatchMode::ReadWrite,
                vec![BatchOp::Add(Record::new().with("id", true))],
            )
            .await;
        assert!(matches!(
            result,
            Err(StorageError::InvalidKey { type_name: "bool", .. })
        ));
    }

    #[tokio::test]
    async fn unique_index_is_enforced() {
        let backend = backend();
        let user = |email: &str, handle: &str| {
            Record::new().with("email", email).with("handle", handle)
        };
        backend
            .run_batch("users", BatchMode::ReadWrite, vec![BatchOp::Add(user("a@x", "al"))])
            .await
            .unwrap();

        let clash = backend
            .run_batch("users", BatchMode::ReadWrite, vec![BatchOp::Add(user("b@x", "al"))])
            .await;
        assert!(matches!(clash, Err(StorageError::ConstraintViolation { .. })));

        // Re-putting the owner with the same handle is fine, and renaming
        // the handle frees the old value.
        backend
            .run_batch(
                "users",
                BatchMode::ReadWrite,
                vec![BatchOp::Put(user("a@x", "al")), BatchOp::Put(user("a@x", "ally"))],
            )
            .await
            .unwrap();
        backend
            .run_batch("users", BatchMode::ReadWrite, vec![BatchOp::Add(user("b@x", "al"))])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_absent_key_is_ok() {
        let backend = backend();
        let outputs = backend
            .run_batch(
                "items",
                BatchMode::ReadWrite,
                vec![BatchOp::Delete(Value::Integer(42))],
            )
            .await
            .unwrap();
        assert_eq!(outputs, vec![BatchOutput::Done]);
    }

    #[tokio::test]
    async fn read_only_batch_counts_and_rejects_writes() {
        let backend = backend();
        seed(&backend, &[1, 2]).await;

        let outputs = backend
            .run_batch("items", BatchMode::ReadOnly, vec![BatchOp::Count])
            .await
            .unwrap();
        assert_eq!(outputs, vec![BatchOutput::Count(2)]);

        // Counting shares the lock with readers.
        let reader = backend.shared.state.read();
        let outputs = backend
            .commit("items", BatchMode::ReadOnly, vec![BatchOp::Count, BatchOp::Count])
            .unwrap();
        assert_eq!(outputs, vec![BatchOutput::Count(2), BatchOutput::Count(2)]);
        drop(reader);

        let result = backend
            .run_batch("items", BatchMode::ReadOnly, vec![BatchOp::Clear])
            .await;
        assert!(matches!(result, Err(StorageError::ReadOnly { .. })));
    }

    #[tokio::test]
    async fn closed_backend_rejects_everything() {
        let backend = backend();
        backend.close();
        assert!(!backend.is_open());

        assert_eq!(
            backend.get("items", &Value::Integer(1)).await,
            Err(StorageError::Closed)
        );
        assert!(backend.open_cursor("items", Direction::Forward).await.is_err());
        assert_eq!(
            backend
                .run_batch("items", BatchMode::ReadWrite, vec![BatchOp::Clear])
                .await,
            Err(StorageError::Closed)
        );

        backend.reopen();
        assert!(backend.get("items", &Value::Integer(1)).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_table() {
        let backend = backend();
        assert_eq!(
            backend.table_schema("nope").await,
            Err(StorageError::table_not_found("nope"))
        );
    }

    #[test]
    fn schema_changes_bump_version() {
        let backend = backend();
        assert_eq!(backend.version(), 1);

        backend.create_table(TableSchema::new("extra")).unwrap();
        assert_eq!(backend.version(), 2);
        assert_eq!(
            backend.create_table(TableSchema::new("extra")),
            Err(StorageError::table_exists("extra"))
        );

        backend.drop_table("extra").unwrap();
        assert_eq!(backend.version(), 3);
        assert_eq!(
            backend.drop_table("extra"),
            Err(StorageError::table_not_found("extra"))
        );
        assert_eq!(
            backend.table_names(),
            vec!["auto".to_string(), "items".to_string(), "users".to_string()]
        );
    }
}
