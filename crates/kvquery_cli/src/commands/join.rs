//! Join command implementation.

use super::load::Loaded;
use super::print_records;
use kvquery_core::{JoinKeys, JoinOptions, JoinType};

/// Runs the join command.
pub async fn run(
    loaded: &Loaded,
    left: &str,
    right: &str,
    keys: &JoinKeys,
    join_type: JoinType,
    limit: Option<usize>,
    offset: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = JoinOptions::new(join_type);
    options.limit = limit;
    options.offset = offset;

    let rows = loaded.db.join(left, right, keys, options).await?;
    print_records(&rows)
}
