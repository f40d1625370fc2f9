//! Cross-crate integration test helpers.
//!
//! [`ModelHarness`] drives a real [`Database`] and mirrors every write
//! in a plain ordered map, so tests can check that reads agree with the
//! model after any sequence of operations.

use crate::fixtures::TestDatabase;
use kvquery_codec::{Record, Value};
use kvquery_core::{matches, paginate, Condition, CoreError, Database, QueryOptions};
use kvquery_storage::Direction;
use std::collections::BTreeMap;

/// A test harness tracking one auto-increment table.
pub struct ModelHarness {
    /// The database under test.
    pub test_db: TestDatabase,
    table: String,
    model: BTreeMap<i64, Record>,
}

impl ModelHarness {
    /// Creates a harness over an empty table named `table`.
    pub fn new(table: &str) -> Self {
        Self {
            test_db: TestDatabase::with_tables(&[table]),
            table: table.to_string(),
            model: BTreeMap::new(),
        }
    }

    /// The database under test.
    pub fn db(&self) -> &Database {
        &self.test_db.db
    }

    /// Inserts records and tracks them under their assigned keys.
    pub async fn insert_many(&mut self, records: Vec<Record>) -> Result<Vec<Value>, CoreError> {
        let keys = self.db().insert_many(&self.table, records.clone()).await?;
        for (key, record) in keys.iter().zip(records) {
            let id = key.as_integer().expect("auto-increment keys are integers");
            self.model.insert(id, record.with("id", id));
        }
        Ok(keys)
    }

    /// Runs a conditional update on both the database and the model.
    pub async fn update_where(
        &mut self,
        condition: &Condition,
        partial: &Record,
    ) -> Result<usize, CoreError> {
        let updated = self.db().update_where(&self.table, condition, partial).await?;
        let mut expected = 0;
        for (id, record) in self.model.iter_mut() {
            if matches(record, condition) {
                *record = partial.merged_with(record).with("id", *id);
                expected += 1;
            }
        }
        assert_eq!(updated, expected, "update_where count disagrees with model");
        Ok(updated)
    }

    /// Runs a conditional delete on both the database and the model.
    pub async fn delete_where(&mut self, condition: &Condition) -> Result<usize, CoreError> {
        let removed = self.db().delete_where(&self.table, condition).await?;
        let before = self.model.len();
        self.model.retain(|_, record| !matches(record, condition));
        assert_eq!(removed, before - self.model.len(), "delete_where count disagrees with model");
        Ok(removed)
    }

    /// Clears both the table and the model.
    pub async fn clear(&mut self) -> Result<(), CoreError> {
        self.db().clear(&self.table).await?;
        self.model.clear();
        Ok(())
    }

    /// What `find` should return according to the model.
    pub fn expected_find(&self, condition: &Condition, options: QueryOptions) -> Vec<Record> {
        let ordered: Vec<Record> = match options.direction.unwrap_or_default() {
            Direction::Forward => self.model.values().cloned().collect(),
            Direction::Reverse => self.model.values().rev().cloned().collect(),
        };
        let matched = ordered
            .into_iter()
            .filter(|record| matches(record, condition))
            .collect();
        paginate(matched, options.offset, options.limit)
    }

    /// Checks `find` against the model.
    pub async fn verify_find(&self, condition: &Condition, options: QueryOptions) {
        let actual = self
            .db()
            .find(&self.table, condition, options)
            .await
            .expect("Failed to find");
        assert_eq!(actual, self.expected_find(condition, options));
    }

    /// Checks the full contents and count against the model.
    pub async fn verify_all(&self) {
        self.verify_find(&Condition::new(), QueryOptions::new()).await;
        let count = self.db().count(&self.table).await.expect("Failed to count");
        assert_eq!(count, self.model.len());
    }
}
