//! Error types for kvquery core.

use kvquery_codec::CodecError;
use kvquery_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in query and join operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The connection is closed or was never opened.
    ///
    /// Never retried; the caller has to reopen.
    #[error("store unavailable: connection is not open")]
    StoreUnavailable,

    /// The table is not part of the schema.
    #[error("table not found: {name}")]
    TableNotFound {
        /// Name of the missing table.
        name: String,
    },

    /// The store rejected a read or write transaction.
    #[error("transaction failed on table {table}: {source}")]
    TransactionFailed {
        /// Table the transaction targeted.
        table: String,
        /// What the store reported.
        #[source]
        source: StorageError,
    },

    /// A storage error outside any table operation (opening, schema).
    #[error("backend error: {0}")]
    Backend(#[source] StorageError),

    /// A value or condition could not be converted.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Operation not permitted or not understood.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound { name: name.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Classifies a storage error raised while working on `table`.
    ///
    /// A closed store becomes [`CoreError::StoreUnavailable`], a missing
    /// table [`CoreError::TableNotFound`], anything else
    /// [`CoreError::TransactionFailed`] carrying the cause.
    pub fn from_storage(table: &str, error: StorageError) -> Self {
        match error {
            StorageError::Closed => Self::StoreUnavailable,
            StorageError::TableNotFound { name } => Self::TableNotFound { name },
            source => Self::TransactionFailed {
                table: table.to_string(),
                source,
            },
        }
    }

    /// Returns true for [`CoreError::StoreUnavailable`].
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}
