//! Find command implementation.

use super::load::Loaded;
use super::print_records;
use kvquery_core::{Condition, QueryOptions};
use tracing::debug;

/// Runs the find command.
pub async fn run(
    loaded: &Loaded,
    table: &str,
    condition: Option<&str>,
    limit: Option<usize>,
    offset: Option<usize>,
    reverse: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let condition = match condition {
        Some(text) => Condition::from_json(serde_json::from_str(text)?)?,
        None => Condition::new(),
    };
    debug!(table, fields = condition.len(), "parsed condition");

    let mut options = QueryOptions::new();
    options.limit = limit;
    options.offset = offset;
    if reverse {
        options = options.reverse();
    }

    let records = loaded.db.find(table, &condition, options).await?;
    print_records(&records)
}
