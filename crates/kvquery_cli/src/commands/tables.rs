//! Tables command implementation.

use super::load::Loaded;
use kvquery_storage::StorageBackend;
use serde::Serialize;

/// Summary of one table.
#[derive(Debug, Serialize)]
pub struct TableSummary {
    /// Table name.
    pub name: String,
    /// Key path field.
    pub key_path: String,
    /// Whether keys are generated.
    pub auto_increment: bool,
    /// Index names.
    pub indexes: Vec<String>,
    /// Number of records.
    pub count: usize,
}

/// Runs the tables command.
pub async fn run(loaded: &Loaded) -> Result<(), Box<dyn std::error::Error>> {
    for name in loaded.backend.table_names() {
        let schema = loaded.backend.table_schema(&name).await?;
        let summary = TableSummary {
            count: loaded.db.count(&name).await?,
            key_path: schema.key_path,
            auto_increment: schema.auto_increment,
            indexes: schema.indexes.into_iter().map(|index| index.name).collect(),
            name,
        };
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}
