//! Error types for storage operations.

use kvquery_codec::CodecError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The connection is closed.
    #[error("storage is closed")]
    Closed,

    /// The table does not exist in the schema.
    #[error("table not found: {name}")]
    TableNotFound {
        /// Name of the missing table.
        name: String,
    },

    /// A table with this name already exists.
    #[error("table already exists: {name}")]
    TableExists {
        /// Name of the duplicate table.
        name: String,
    },

    /// A write would break a key or unique-index constraint.
    #[error("constraint violation in table {table}: {message}")]
    ConstraintViolation {
        /// Table the write targeted.
        table: String,
        /// Description of the violated constraint.
        message: String,
    },

    /// A value cannot be used as a key.
    #[error("invalid key of type {type_name} for table {table}")]
    InvalidKey {
        /// Table the key was used with.
        table: String,
        /// Kind of the rejected value.
        type_name: &'static str,
    },

    /// A record has no key and the table does not generate keys.
    #[error("record for table {table} is missing key path {key_path}")]
    MissingKey {
        /// Table the write targeted.
        table: String,
        /// The table's key path.
        key_path: String,
    },

    /// A write was submitted in a read-only batch.
    #[error("write submitted to read-only batch on table {table}")]
    ReadOnly {
        /// Table the batch targeted.
        table: String,
    },

    /// The schema is malformed.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of the problem.
        message: String,
    },

    /// Record encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl StorageError {
    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound { name: name.into() }
    }

    /// Creates a table exists error.
    pub fn table_exists(name: impl Into<String>) -> Self {
        Self::TableExists { name: name.into() }
    }

    /// Creates a constraint violation error.
    pub fn constraint_violation(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }
}
