//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use kvquery_core::Database;
use kvquery_storage::{DatabaseConfig, InMemoryBackend, TableSchema};
use std::sync::Arc;

/// A test database over a fresh in-memory backend.
///
/// The backend handle is kept so tests can close, reopen, or inspect
/// the store underneath the facade.
pub struct TestDatabase {
    /// The database facade.
    pub db: Database,
    /// The backend the facade runs on.
    pub backend: InMemoryBackend,
}

impl TestDatabase {
    /// Opens a database with the tables in `config`.
    pub fn open(config: DatabaseConfig) -> Self {
        let backend = InMemoryBackend::open(config).expect("Failed to open in-memory backend");
        Self {
            db: Database::new(Arc::new(backend.clone())),
            backend,
        }
    }

    /// Opens a database with one table per name, each keyed by an
    /// auto-incrementing `id`.
    pub fn with_tables(names: &[&str]) -> Self {
        let config = names.iter().fold(DatabaseConfig::new("test"), |config, name| {
            config.table(TableSchema::new(*name).auto_increment(true))
        });
        Self::open(config)
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use kvquery_codec::Record;
    use kvquery_core::JoinKeys;
    use serde_json::json;

    /// Users Alice and Bob in department 1, Charlie in 2, David in the
    /// nonexistent 4; departments 1 Engineering, 2 Marketing, 3 Sales.
    pub async fn users_and_departments() -> TestDatabase {
        let test_db = TestDatabase::open(
            DatabaseConfig::new("company")
                .table(TableSchema::new("users"))
                .table(TableSchema::new("departments").key_path("deptId")),
        );
        test_db
            .db
            .insert_json(
                "users",
                json!([
                    {"id": 1, "name": "Alice", "departmentId": 1},
                    {"id": 2, "name": "Bob", "departmentId": 1},
                    {"id": 3, "name": "Charlie", "departmentId": 2},
                    {"id": 4, "name": "David", "departmentId": 4},
                ]),
            )
            .await
            .expect("Failed to seed users");
        test_db
            .db
            .insert_json(
                "departments",
                json!([
                    {"deptId": 1, "deptName": "Engineering"},
                    {"deptId": 2, "deptName": "Marketing"},
                    {"deptId": 3, "deptName": "Sales"},
                ]),
            )
            .await
            .expect("Failed to seed departments");
        test_db
    }

    /// Pairing keys for [`users_and_departments`].
    pub fn dept_keys() -> JoinKeys {
        JoinKeys::new("departmentId", "deptId")
    }

    /// A `people` table holding one record per age, keyed 1..=n.
    pub async fn people_with_ages(ages: &[i64]) -> TestDatabase {
        let test_db = TestDatabase::with_tables(&["people"]);
        let records = ages
            .iter()
            .map(|&age| Record::new().with("age", age))
            .collect();
        test_db
            .db
            .insert_many("people", records)
            .await
            .expect("Failed to seed people");
        test_db
    }

    /// An `items` table holding `count` records with `n` = 0..count.
    pub async fn numbered_items(count: usize) -> TestDatabase {
        let test_db = TestDatabase::with_tables(&["items"]);
        let records = (0..count)
            .map(|n| Record::new().with("n", n as i64))
            .collect();
        test_db
            .db
            .insert_many("items", records)
            .await
            .expect("Failed to seed items");
        test_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_tables() {
        let test_db = TestDatabase::with_tables(&["a", "b"]);
        assert_eq!(test_db.backend.table_names(), vec!["a", "b"]);
        assert_eq!(test_db.count("a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_company_scenario() {
        let test_db = scenarios::users_and_departments().await;
        assert_eq!(test_db.count("users").await.unwrap(), 4);
        assert_eq!(test_db.count("departments").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_numbered_items() {
        let test_db = scenarios::numbered_items(7).await;
        assert_eq!(test_db.count("items").await.unwrap(), 7);
    }
}
