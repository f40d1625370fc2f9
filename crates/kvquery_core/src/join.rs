//! Join engine: hash joins between two fully read tables.
//!
//! The right table is indexed by its pairing key, then the left table is
//! walked in key order. Matched pairs become one merged row each, with
//! left fields winning on collisions. Unmatched rows are padded with a
//! null placeholder shaped like the other side when the join type keeps
//! them.
//!
//! A pairing-key value counts as processed as soon as any left record
//! matched it, and right-unmatched rows are selected by that value. Two
//! right records sharing a key therefore stand or fall together.

use crate::error::CoreResult;
use crate::options::{paginate, JoinKeys, JoinOptions, JoinType, QueryOptions};
use crate::query::QueryEngine;
use kvquery_codec::{Record, Value};
use kvquery_storage::Direction;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Shallow merge of two records where `primary` wins on collisions.
///
/// Neither input is modified; the result is a new record.
pub fn merge_records(primary: &Record, secondary: &Record) -> Record {
    primary.merged_with(secondary)
}

/// Joins two record lists in memory.
///
/// `left` and `right` are taken in the order given. Pagination is not
/// applied here.
pub fn hash_join(
    left: &[Record],
    right: &[Record],
    keys: &JoinKeys,
    join_type: JoinType,
) -> Vec<Record> {
    let mut index: HashMap<&Value, Vec<&Record>> = HashMap::new();
    for record in right {
        if let Some(key) = record.get(&keys.right_key) {
            index.entry(key).or_default().push(record);
        }
    }

    let right_null = Record::null_shaped(right);
    let mut processed: HashSet<&Value> = HashSet::new();
    let mut output = Vec::new();

    for record in left {
        let matches = record
            .get(&keys.left_key)
            .and_then(|key| index.get_key_value(key));

        match matches {
            Some((key, partners)) => {
                processed.insert(*key);
                output.extend(partners.iter().map(|partner| merge_records(record, partner)));
            }
            None if join_type.keeps_left() => output.push(merge_records(record, &right_null)),
            None => {}
        }
    }

    if join_type.keeps_right() {
        let left_null = Record::null_shaped(left);
        output.extend(
            right
                .iter()
                .filter(|record| {
                    record
                        .get(&keys.right_key)
                        .map_or(true, |key| !processed.contains(key))
                })
                .map(|record| merge_records(record, &left_null)),
        );
    }

    output
}

/// Joins whole tables through a [`QueryEngine`].
#[derive(Debug, Clone)]
pub struct JoinEngine {
    query: QueryEngine,
}

impl JoinEngine {
    /// Creates a join engine reading through `query`.
    pub fn new(query: QueryEngine) -> Self {
        Self { query }
    }

    /// Joins `left` and `right` on `keys`.
    ///
    /// Both tables are read in full, in forward key order. The join runs
    /// in memory and `options.offset`/`options.limit` slice the result.
    ///
    /// # Errors
    ///
    /// Fails if either table read fails.
    pub async fn join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        let forward = QueryOptions::new().direction(Direction::Forward);
        let left_records = self.query.get_all(left, forward).await?;
        let right_records = self.query.get_all(right, forward).await?;

        let joined = hash_join(&left_records, &right_records, keys, options.join_type);
        let total = joined.len();
        let page = paginate(joined, options.offset, options.limit);

        debug!(
            left,
            right,
            join_type = %options.join_type,
            total,
            returned = page.len(),
            "join"
        );
        Ok(page)
    }

    /// Inner join: matched pairs only.
    ///
    /// # Errors
    ///
    /// See [`JoinEngine::join`].
    pub async fn inner_join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join(left, right, keys, options.with_type(JoinType::Inner))
            .await
    }

    /// Left join: every left record at least once.
    ///
    /// # Errors
    ///
    /// See [`JoinEngine::join`].
    pub async fn left_join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join(left, right, keys, options.with_type(JoinType::Left))
            .await
    }

    /// Right join: matched pairs plus unmatched right records.
    ///
    /// # Errors
    ///
    /// See [`JoinEngine::join`].
    pub async fn right_join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join(left, right, keys, options.with_type(JoinType::Right))
            .await
    }

    /// Full join: matched pairs plus unmatched records from both sides.
    ///
    /// # Errors
    ///
    /// See [`JoinEngine::join`].
    pub async fn full_join(
        &self,
        left: &str,
        right: &str,
        keys: &JoinKeys,
        options: JoinOptions,
    ) -> CoreResult<Vec<Record>> {
        self.join(left, right, keys, options.with_type(JoinType::Full))
            .await
    }
}
