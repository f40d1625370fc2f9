//! Benchmark utilities.

#![warn(missing_docs)]

use kvquery_codec::Record;
use kvquery_core::Database;
use kvquery_storage::{DatabaseConfig, TableSchema};
use rand::Rng;

/// Builds a current-thread runtime for driving async calls in benches.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime")
}

/// Generates a person record with random age, department and flag.
pub fn random_person(rng: &mut impl Rng, departments: i64) -> Record {
    Record::new()
        .with("name", format!("user-{}", rng.gen::<u32>()))
        .with("age", rng.gen_range(18..80i64))
        .with("departmentId", rng.gen_range(1..=departments))
        .with("active", rng.gen_bool(0.5))
}

/// Opens a database with `people` and `departments` tables filled with
/// `people` random people spread over `departments` departments.
pub async fn seeded_database(people: usize, departments: i64) -> Database {
    let db = Database::open_in_memory(
        DatabaseConfig::new("bench")
            .table(TableSchema::new("people").auto_increment(true))
            .table(TableSchema::new("departments").key_path("deptId")),
    )
    .expect("Failed to open database");

    let records = {
        let mut rng = rand::thread_rng();
        (0..people)
            .map(|_| random_person(&mut rng, departments))
            .collect()
    };
    db.insert_many("people", records)
        .await
        .expect("Failed to seed people");

    let departments = (1..=departments)
        .map(|id| {
            Record::new()
                .with("deptId", id)
                .with("deptName", format!("dept-{id}"))
        })
        .collect();
    db.insert_many("departments", departments)
        .await
        .expect("Failed to seed departments");

    db
}
