//! Database facade: the explicit connection object.

use crate::condition::Condition;
use crate::config::Config;
use crate::connection::Connection;
use crate::error::{CoreError, CoreResult};
use crate::join::JoinEngine;
use crate::options::{JoinKeys, JoinOptions, QueryOptions};
use crate::query::QueryEngine;
use kvquery_codec::{CodecError, Record, Value};
use kvquery_storage::{DatabaseConfig, InMemoryBackend, StorageBackend};
use std::sync::Arc;
use tracing::info;

/// Handle to a database.
///
/// There is no global store: every operation goes through a `Database`
/// built over an injected [`StorageBackend`]. Clones share the backend
/// and the connection state.
///
/// # Example
///
/// ```rust
/// use kvquery_codec::Record;
/// use kvquery_core::{Condition, Database, OperatorSet, QueryOptions};
/// use kvquery_storage::{DatabaseConfig, TableSchema};
///
/// # tokio_test_block(async {
/// let db = Database::open_in_memory(
///     DatabaseConfig::new("app").table(TableSchema::new("users").auto_increment(true)),
/// )
/// .unwrap();
///
/// db.insert("users", Record::new().with("name", "Alice").with("age", 30))
///     .await
///     .unwrap();
/// db.insert("users", Record::new().with("name", "Bob").with("age", 22))
///     .await
///     .unwrap();
///
/// let adults = db
///     .find(
///         "users",
///         &Condition::new().with_ops("age", OperatorSet::new().gte(25)),
///         QueryOptions::new(),
///     )
///     .await
///     .unwrap();
/// assert_eq!(adults.len(), 1);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    conn: Connection,
    query: QueryEngine,
    join: JoinEngine,
}

impl Database {
    /// Wraps a backend with the default configuration.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_config(backend, Config::default())
    }

    /// Wraps a backend with a custom configuration.
    pub fn with_config(backend: Arc<dyn StorageBackend>, config: Config) -> Self {
        let conn = Connection::new(backend);
        let query = QueryEngine::new(conn.clone(), config.default_direction);
        let join = JoinEngine::new(query.clone());
        Self { conn, query, join }
    }

    /// Opens a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Fails if `config` is invalid.
    pub fn open_in_memory(config: DatabaseConfig) -> CoreResult<Self> {
        let name = config.name.clone();
        let backend = InMemoryBackend::open(config).map_err(CoreError::Backend)?;
        info!(database = %name, "opened in-memory database");
        Ok(Self::new(Arc::new(backend)))
    }

    /// Closes this handle and every clone of it. The backend is not
    /// touched; other handles built over it keep working.
    pub fn close(&self) {
        self.conn.close();
        info!("database closed");
    }

    /// Returns true while operations may run.
    pub fn is_open(&self) -> bool {
        self.conn.is_open()
    }

    /// Returns the query engine.
    pub fn query(&self) -> &QueryEngine {
        &self.query
    }

    /// Returns the join engine.
    pub fn joins(&self) -> &JoinEngine {
        &self.join
    }

    /// See [`QueryEngine::get_all`].
    ///
    /// # Errors
    ///
    /// Fails if the read fails.
    pub async fn get_all(&self, table: &str, options: QueryOptions) -> CoreResult<Vec<Record>> {
        self.query.get_all(table, options).await
    }

    /// See [`QueryEngine::get`].
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub async fn get(&self, table: &str, key: &Value) -> CoreResult<Option<Record>> {
        self.query.get(table, key).await
    }

    /// See [`QueryEngine::find`].
    ///
    /// # Errors
    ///
    /// Fails if the read fails.
    pub async fn find(
        &self,
        table: &str,
        condition: &Condition,
        options: QueryOptions,
    ) -> CoreResult<Vec<Record>> {
        self.query.find(table, condition, options).await
    }

    /// Like [`Database::find`], with the condition given as JSON.
    ///
    /// # Errors
    ///
    /// [`CoreError::Codec`] if the condition does not parse.
    pub async fn find_json(
        &self,
        table: &str,
        condition: serde_json::Value,
        options: QueryOptions,
    ) -> CoreResult<Vec<Record>> {
        let condition = Condition::from_json(condition)?;
        self.query.find(table, &condition, options).await
    }

    /// See [`QueryEngine::count`].
    ///
    /// # Errors
    ///
    /// Fails if the count fails.
    pub async fn count(&self, table: &str) -> CoreResult<usize> {
        self.query.count(table).await
    }

    /// See [`QueryEngine::insert`].
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the write.
    pub async fn insert(&self, table: &str, record: Record) -> CoreResult<Value> {
        self.query.insert(table, record).await
    }

    /// See [`QueryEngine::insert_many`].
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the batch.
    pub async fn insert_many(&self, table: &str, records: Vec<Record>) -> CoreResult<Vec<Value>> {
        self.query.insert_many(table, records).await
    }

    /// Inserts a JSON array of objects as one batch.
    ///
    /// # Errors
    ///
    /// [`CoreError::Codec`] if `rows` is not an array of objects, or any
    /// insert failure.
    pub async fn insert_json(
        &self,
        table: &str,
        rows: serde_json::Value,
    ) -> CoreResult<Vec<Value>> {
        let serde_json::Value::Array(rows) = rows else {
            return Err(CodecError::invalid_structure("expected an array of records").into());
        };
        let records = rows
            .into_iter()
            .map(Record::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        self.query.insert_many(table, records).await
    }

    /// See [`QueryEngine::update`].
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the write.
    pub async fn update(&self, table: &str, record: Record) -> CoreResult<Value> {
        self.query.update(table, record).await
    }

    /// See [`QueryEngine::update_many`].
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the batch.
    pub async fn update_many(&self, table: &str, records: Vec<Record>) -> CoreResult<Vec<Value>> {
        self.query.update_many(table, records).await
    }

    /// See [`QueryEngine::update_where`].
    ///
    /// # Errors
    ///
    /// Fails if the find or the batch fails.
    pub async fn update_where(
        &self,
        table: &str,
        condition: &Condition,
        partial: &Record,
    ) -> CoreResult<usize> {
        self.query.update_where(table, condition, partial).await
    }

    /// See [`QueryEngine::delete`].
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the delete.
    pub async fn delete(&self, table: &str, key: Value) -> CoreResult<()> {
        self.query.delete(table, key).await
    }

    /// See [`QueryEngine::delete_many`].
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the batch.
    pub async fn delete_many(&self, table: &str, keys: Vec<Value>) -> CoreResult<()> {
        self.query.delete_many(table, keys).await
    }

    /// See [`QueryEngine::delete_where`].
    ///
    /// # Errors
    ///
    /// Fails if the find or the batch fails.
    pub async fn delete_where(&self, table: &str, condition: &Condition) -> CoreResult<usize> {
        self.query.delete_where(table, condition).await
    }

    /// See [`QueryEngine::clear`].
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the clear.
    pub async fn clear(&self, table: &str) -> CoreResult<()> {
        self.query.clear(table).await
    }

    /// See [`JoinEngine::join`].
    ///
    /// # Errors
    ///
    /// Fails if either table read fails.
    pub async fn join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join.join(left, right, keys, options).await
    }

    /// See [`JoinEngine::inner_join`].
    ///
    /// # Errors
    ///
    /// Fails if either table read fails.
    pub async fn inner_join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join.inner_join(left, right, keys, options).await
    }

    /// See [`JoinEngine::left_join`].
    ///
    /// # Errors
    ///
    /// Fails if either table read fails.
    pub async fn left_join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join.left_join(left, right, keys, options).await
    }

    /// See [`JoinEngine::right_join`].
    ///
    /// # Errors
    ///
    /// Fails if either table read fails.
    pub async fn right_join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join.right_join(left, right, keys, options).await
    }

    /// See [`JoinEngine::full_join`].
    ///
    /// # Errors
    ///
    /// Fails if either table read fails.
    pub async fn full_join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join.full_join(left, right, keys, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::JoinType;
    use async_trait::async_trait;
    use kvquery_storage::{
        BatchMode, BatchOp, BatchOutput, Direction, RecordCursor, StorageError, StorageResult,
        TableSchema,
    };
    use serde_json::json;

    fn scenario() -> Database {
        Database::open_in_memory(
            DatabaseConfig::new("test")
                .table(TableSchema::new("users"))
                .table(TableSchema::new("departments").key_path("deptId")),
        )
        .unwrap()
    }

    async fn seeded() -> Database {
        let db = scenario();
        db.insert_json(
            "users",
            json!([
                {"id": 1, "name": "Alice", "departmentId": 1},
                {"id": 2, "name": "Bob", "departmentId": 1},
                {"id": 3, "name": "Charlie", "departmentId": 2},
                {"id": 4, "name": "David", "departmentId": 4},
            ]),
        )
        .await
        .unwrap();
        db.insert_json(
            "departments",
            json!([
                {"deptId": 1, "deptName": "Engineering"},
                {"deptId": 2, "deptName": "Marketing"},
                {"deptId": 3, "deptName": "Sales"},
            ]),
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn join_wrappers_fix_the_type() {
        let db = seeded().await;
        let keys = JoinKeys::new("departmentId", "deptId");
        let any = JoinOptions::new(JoinType::Full);

        let inner = db.inner_join("users", "departments", &keys, any).await.unwrap();
        let left = db.left_join("users", "departments", &keys, any).await.unwrap();
        let right = db.right_join("users", "departments", &keys, any).await.unwrap();
        let full = db.full_join("users", "departments", &keys, any).await.unwrap();
        assert_eq!((inner.len(), left.len(), right.len(), full.len()), (3, 4, 4, 5));
    }

    #[tokio::test]
    async fn join_paginates_output() {
        let db = seeded().await;
        let keys = JoinKeys::new("departmentId", "deptId");
        let rows = db
            .join(
                "users",
                "departments",
                &keys,
                JoinOptions::new(JoinType::Full).offset(3).limit(1),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("David")));
    }

    #[tokio::test]
    async fn join_missing_table() {
        let db = seeded().await;
        let err = db
            .join("users", "ghost", &JoinKeys::new("a", "b"), JoinOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TableNotFound { name } if name == "ghost"));
    }

    #[tokio::test]
    async fn find_json_parses_condition() {
        let db = seeded().await;
        let rows = db
            .find_json("users", json!({"departmentId": {"lt": 2}}), QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let err = db
            .find_json("users", json!("nope"), QueryOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Codec(_)));
    }

    #[tokio::test]
    async fn fractional_numbers_are_stored_and_queried() {
        let db = Database::open_in_memory(
            DatabaseConfig::new("shop").table(TableSchema::new("products").auto_increment(true)),
        )
        .unwrap();
        db.insert_json(
            "products",
            json!([
                {"name": "pen", "price": 1.5},
                {"name": "pad", "price": 0.25},
                {"name": "ink", "price": 3},
            ]),
        )
        .await
        .unwrap();

        let pen = db.get("products", &Value::from(1)).await.unwrap().unwrap();
        assert_eq!(pen.get("price"), Some(&Value::Float(1.5)));

        let rows = db
            .find_json("products", json!({"price": {"gt": 0.5}}), QueryOptions::new())
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.get_or_null("name").clone()).collect();
        assert_eq!(names, vec![Value::from("pen"), Value::from("ink")]);

        let cheap = db
            .find_json("products", json!({"price": {"lte": 1.5}}), QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(cheap.len(), 2);
    }

    #[tokio::test]
    async fn insert_json_rejects_non_arrays() {
        let db = scenario();
        let err = db.insert_json("users", json!({"id": 1})).await.unwrap_err();
        assert!(matches!(err, CoreError::Codec(_)));
    }

    #[tokio::test]
    async fn default_direction_from_config() {
        let backend = InMemoryBackend::open(DatabaseConfig::new("t").table(TableSchema::new("n")))
            .unwrap();
        let db = Database::with_config(
            Arc::new(backend),
            Config::new().default_direction(Direction::Reverse),
        );
        db.insert_many(
            "n",
            (1..=3).map(|id| Record::new().with("id", id)).collect(),
        )
        .await
        .unwrap();

        let rows = db.get_all("n", QueryOptions::new()).await.unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::from(3)));
    }

    #[tokio::test]
    async fn every_operation_fails_after_close() {
        let db = seeded().await;
        let keys = JoinKeys::new("departmentId", "deptId");
        let clone = db.clone();
        db.close();
        assert!(!clone.is_open());

        let everything = Condition::new();
        let partial = Record::new().with("x", 1);
        let results = vec![
            db.get_all("users", QueryOptions::new()).await.map(|_| ()),
            db.get("users", &Value::from(1)).await.map(|_| ()),
            db.find("users", &everything, QueryOptions::new()).await.map(|_| ()),
            db.count("users").await.map(|_| ()),
            db.insert("users", Record::new().with("id", 9)).await.map(|_| ()),
            db.insert_many("users", vec![]).await.map(|_| ()),
            db.update("users", Record::new().with("id", 1)).await.map(|_| ()),
            db.update_many("users", vec![]).await.map(|_| ()),
            db.update_where("users", &everything, &partial).await.map(|_| ()),
            db.delete("users", Value::from(1)).await,
            db.delete_many("users", vec![]).await,
            db.delete_where("users", &everything).await.map(|_| ()),
            db.clear("users").await,
            db.join("users", "departments", &keys, JoinOptions::default()).await.map(|_| ()),
        ];
        for result in results {
            assert!(result.unwrap_err().is_unavailable());
        }
    }

    struct FailingCursor;

    #[async_trait]
    impl RecordCursor for FailingCursor {
        async fn next(&mut self) -> StorageResult<Option<Record>> {
            Err(StorageError::invalid_schema("cursor broke"))
        }

        async fn advance(&mut self, _count: usize) -> StorageResult<()> {
            Ok(())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl StorageBackend for FailingBackend {
        fn is_open(&self) -> bool {
            true
        }

        async fn table_schema(&self, table: &str) -> StorageResult<TableSchema> {
            Ok(TableSchema::new(table))
        }

        async fn open_cursor(
            &self,
            _table: &str,
            _direction: Direction,
        ) -> StorageResult<Box<dyn RecordCursor>> {
            Ok(Box::new(FailingCursor))
        }

        async fn get(&self, _table: &str, _key: &Value) -> StorageResult<Option<Record>> {
            Ok(None)
        }

        async fn run_batch(
            &self,
            table: &str,
            _mode: BatchMode,
            _ops: Vec<BatchOp>,
        ) -> StorageResult<Vec<BatchOutput>> {
            Err(StorageError::constraint_violation(table, "rejected"))
        }
    }

    #[tokio::test]
    async fn backend_failures_become_transaction_failures() {
        let db = Database::new(Arc::new(FailingBackend));

        let err = db.get_all("t", QueryOptions::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::TransactionFailed { table, .. } if table == "t"));

        let err = db.insert("t", Record::new().with("id", 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::TransactionFailed { .. }));

        let err = db.count("t").await.unwrap_err();
        assert!(matches!(err, CoreError::TransactionFailed { .. }));

        assert_eq!(db.get("t", &Value::from(1)).await.unwrap(), None);
    }
}
