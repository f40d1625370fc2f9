//! CLI command implementations.

pub mod count;
pub mod find;
pub mod join;
pub mod load;
pub mod tables;

use kvquery_codec::Record;

/// Prints records as JSON lines on stdout.
pub(crate) fn print_records(records: &[Record]) -> Result<(), Box<dyn std::error::Error>> {
    for record in records {
        println!("{}", serde_json::to_string(&record.to_json()?)?);
    }
    Ok(())
}
