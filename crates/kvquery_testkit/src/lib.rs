//! # kvquery testkit
//!
//! Test utilities for kvquery.
//!
//! This crate provides:
//! - Test fixtures and seeded databases
//! - Property-based test generators using proptest
//! - A model-checking harness that mirrors writes in a plain map
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kvquery_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn joins_users_to_departments() {
//!     let db = scenarios::users_and_departments().await;
//!     let keys = scenarios::dept_keys();
//!     let rows = db
//!         .inner_join("users", "departments", &keys, Default::default())
//!         .await
//!         .unwrap();
//!     assert_eq!(rows.len(), 3);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
