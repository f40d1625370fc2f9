//! Count command implementation.

use super::load::Loaded;
use serde::Serialize;

/// Count result.
#[derive(Debug, Serialize)]
pub struct CountResult<'a> {
    /// Table name.
    pub table: &'a str,
    /// Number of records.
    pub count: usize,
}

/// Runs the count command.
pub async fn run(loaded: &Loaded, table: &str) -> Result<(), Box<dyn std::error::Error>> {
    let count = loaded.db.count(table).await?;
    println!("{}", serde_json::to_string(&CountResult { table, count })?);
    Ok(())
}
