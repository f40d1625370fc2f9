//! kvquery CLI
//!
//! Loads a schema and a JSON data set into an in-memory database and
//! runs queries against it.
//!
//! # Commands
//!
//! - `tables` - List tables with their key path and record count
//! - `count` - Count the records in a table
//! - `find` - Find records matching a JSON condition
//! - `join` - Join two tables on a pairing field
//!
//! Results are printed as JSON lines.

mod commands;

use clap::{Parser, Subcommand};
use kvquery_core::JoinType;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// kvquery command-line query tool.
#[derive(Parser)]
#[command(name = "kvquery")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the schema file (JSON database config)
    #[arg(global = true, short, long)]
    schema: Option<PathBuf>,

    /// Path to the data file (JSON object of table name to records)
    #[arg(global = true, short, long)]
    data: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables with their key path and record count
    Tables,

    /// Count the records in a table
    Count {
        /// Table name
        table: String,
    },

    /// Find records matching a condition
    Find {
        /// Table name
        table: String,

        /// Condition as a JSON object, e.g. '{"age": {"gte": 25}}'
        #[arg(short = 'w', long = "where")]
        condition: Option<String>,

        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number of matches to skip
        #[arg(short, long)]
        offset: Option<usize>,

        /// Scan in descending key order
        #[arg(short, long)]
        reverse: bool,
    },

    /// Join two tables on a pairing field
    Join {
        /// Left table name
        left: String,

        /// Right table name
        right: String,

        /// Pairing field on the left table
        #[arg(long)]
        left_key: String,

        /// Pairing field on the right table
        #[arg(long)]
        right_key: String,

        /// Join type (inner, left, right, full)
        #[arg(short = 't', long = "type", default_value = "inner")]
        join_type: JoinType,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number of rows to skip
        #[arg(short, long)]
        offset: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let schema = cli.schema.ok_or("Schema path required (--schema)")?;
    let loaded = commands::load::open(&schema, cli.data.as_deref()).await?;

    match cli.command {
        Commands::Tables => commands::tables::run(&loaded).await?,
        Commands::Count { table } => commands::count::run(&loaded, &table).await?,
        Commands::Find {
            table,
            condition,
            limit,
            offset,
            reverse,
        } => {
            commands::find::run(&loaded, &table, condition.as_deref(), limit, offset, reverse)
                .await?;
        }
        Commands::Join {
            left,
            right,
            left_key,
            right_key,
            join_type,
            limit,
            offset,
        } => {
            let keys = kvquery_core::JoinKeys::new(left_key, right_key);
            commands::join::run(&loaded, &left, &right, &keys, join_type, limit, offset).await?;
        }
    }

    Ok(())
}
