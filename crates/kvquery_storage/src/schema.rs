//! Schema and configuration types.
//!
//! A [`DatabaseConfig`] describes a database: its name, version, and
//! tables. It can be built in code or loaded from JSON:
//!
//! ```
//! use kvquery_storage::DatabaseConfig;
//!
//! let config = DatabaseConfig::from_json(r#"{
//!     "name": "shop",
//!     "tables": [
//!         {"name": "users", "auto_increment": true,
//!          "indexes": [{"name": "by_email", "field": "email", "unique": true}]},
//!         {"name": "departments", "key_path": "dept_id"}
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(config.version, 1);
//! assert_eq!(config.tables[0].key_path, "id");
//! assert_eq!(config.tables[1].key_path, "dept_id");
//! ```

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_key_path() -> String {
    "id".to_string()
}

fn default_version() -> u32 {
    1
}

/// A secondary index definition.
///
/// The query layer never scans through indexes; the backend uses them
/// only to enforce uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name, unique within the table.
    pub name: String,
    /// Field the index is built over.
    pub field: String,
    /// Whether two records may share a value of `field`.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSchema {
    /// Creates a non-unique index.
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            unique: false,
        }
    }

    /// Sets the uniqueness flag.
    #[must_use]
    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Field holding each record's unique key.
    #[serde(default = "default_key_path")]
    pub key_path: String,
    /// Whether missing keys are generated from a counter.
    #[serde(default)]
    pub auto_increment: bool,
    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    /// Creates a table keyed by `id` without auto-increment.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: default_key_path(),
            auto_increment: false,
            indexes: Vec::new(),
        }
    }

    /// Sets the key path.
    #[must_use]
    pub fn key_path(mut self, key_path: impl Into<String>) -> Self {
        self.key_path = key_path.into();
        self
    }

    /// Sets whether keys are generated.
    #[must_use]
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Checks the definition for problems.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or key path, or duplicate index names.
    pub fn validate(&self) -> StorageResult<()> {
        if self.name.is_empty() {
            return Err(StorageError::invalid_schema("table name is empty"));
        }
        if self.key_path.is_empty() {
            return Err(StorageError::invalid_schema(format!(
                "table {} has an empty key path",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for index in &self.indexes {
            if !seen.insert(index.name.as_str()) {
                return Err(StorageError::invalid_schema(format!(
                    "table {} declares index {} twice",
                    self.name, index.name
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for opening a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database name.
    pub name: String,
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Tables to create.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "kvquery".to_string(),
            version: default_version(),
            tables: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    /// Creates an empty configuration named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the version.
    #[must_use]
    pub const fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Fails if the JSON does not describe a configuration.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        serde_json::from_str(json).map_err(|e| StorageError::invalid_schema(e.to_string()))
    }

    /// Checks every table and rejects duplicate table names.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> StorageResult<()> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !seen.insert(table.name.as_str()) {
                return Err(StorageError::table_exists(&table.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_pattern() {
        let config = DatabaseConfig::new("shop").version(3).table(
            TableSchema::new("users")
                .auto_increment(true)
                .index(IndexSchema::new("by_email", "email").unique(true)),
        );

        assert_eq!(config.name, "shop");
        assert_eq!(config.version, 3);
        assert_eq!(config.tables[0].key_path, "id");
        assert!(config.tables[0].auto_increment);
        assert!(config.tables[0].indexes[0].unique);
    }

    #[test]
    fn json_defaults() {
        let config = DatabaseConfig::from_json(r#"{"name": "x", "tables": [{"name": "t"}]}"#)
            .unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.tables[0], TableSchema::new("t"));
    }

    #[test]
    fn bad_json_is_invalid_schema() {
        assert!(matches!(
            DatabaseConfig::from_json("{"),
            Err(StorageError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn duplicate_tables_rejected() {
        let config = DatabaseConfig::new("x")
            .table(TableSchema::new("t"))
            .table(TableSchema::new("t"));
        assert_eq!(config.validate(), Err(StorageError::table_exists("t")));
    }

    #[test]
    fn empty_key_path_rejected() {
        let table = TableSchema::new("t").key_path("");
        assert!(matches!(
            table.validate(),
            Err(StorageError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn duplicate_index_rejected() {
        let table = TableSchema::new("t")
            .index(IndexSchema::new("a", "x"))
            .index(IndexSchema::new("a", "y"));
        assert!(table.validate().is_err());
    }
}
