//! Stress helpers for kvquery.
//!
//! These drive a database from many tokio tasks at once and report
//! throughput and failures.

use kvquery_codec::Record;
use kvquery_core::{Condition, Database, OperatorSet, QueryOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per task.
    pub operations: usize,
    /// Number of concurrent tasks.
    pub tasks: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 200,
            tasks: 4,
        }
    }
}

/// Runs inserts, finds and conditional deletes on `table` from
/// `config.tasks` concurrent tasks.
///
/// Every task works on its own `task` value, so the conditional deletes
/// of one task never touch another task's records.
pub async fn stress_mixed_tasks(
    db: &Database,
    table: &str,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.tasks)
        .map(|task| {
            let db = db.clone();
            let table = table.to_string();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;

            tokio::spawn(async move {
                let mine = Condition::new().equals("task", task as i64);
                for i in 0..operations {
                    let result = match i % 3 {
                        0 => db
                            .insert(
                                &table,
                                Record::new().with("task", task as i64).with("i", i as i64),
                            )
                            .await
                            .map(|_| ()),
                        1 => db
                            .find(&table, &mine, QueryOptions::new().limit(10))
                            .await
                            .map(|_| ()),
                        _ => {
                            let old = mine
                                .clone()
                                .with_ops("i", OperatorSet::new().lt(i as i64 / 2));
                            db.delete_where(&table, &old).await.map(|_| ())
                        }
                    };
                    match result {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.await.is_err() {
            failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
