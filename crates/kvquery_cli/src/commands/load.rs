//! Loads a schema and data set into an in-memory database.

use kvquery_core::Database;
use kvquery_storage::{DatabaseConfig, InMemoryBackend};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A populated in-memory database.
pub struct Loaded {
    /// The backend, for table listing.
    pub backend: InMemoryBackend,
    /// The query facade over `backend`.
    pub db: Database,
}

/// Reads the schema file and optional data file and loads them.
pub async fn open(
    schema: &Path,
    data: Option<&Path>,
) -> Result<Loaded, Box<dyn std::error::Error>> {
    let schema_text = std::fs::read_to_string(schema)
        .map_err(|e| format!("Cannot read schema {}: {e}", schema.display()))?;
    let data = match data {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read data {}: {e}", path.display()))?;
            Some(serde_json::from_str(&text)?)
        }
        None => None,
    };
    from_json(&schema_text, data).await
}

/// Builds the database from a schema document and a data object mapping
/// table names to arrays of records.
pub async fn from_json(
    schema: &str,
    data: Option<serde_json::Value>,
) -> Result<Loaded, Box<dyn std::error::Error>> {
    let config = DatabaseConfig::from_json(schema)?;
    let backend = InMemoryBackend::open(config)?;
    let db = Database::new(Arc::new(backend.clone()));

    match data {
        Some(serde_json::Value::Object(tables)) => {
            for (table, rows) in tables {
                let keys = db.insert_json(&table, rows).await?;
                info!(table = %table, records = keys.len(), "loaded table");
            }
        }
        Some(_) => return Err("Data file must be a JSON object of table name to records".into()),
        None => {}
    }

    Ok(Loaded { backend, db })
}
