//! Pagination, direction, and join options.

use crate::error::CoreError;
use kvquery_storage::Direction;
use std::fmt;
use std::str::FromStr;

/// Options for reads and finds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Number of records to skip first.
    pub offset: Option<usize>,
    /// Scan direction; the configured default when `None`.
    pub direction: Option<Direction>,
}

impl QueryOptions {
    /// No limit, no offset, default direction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the direction.
    #[must_use]
    pub const fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Scans in descending key order.
    #[must_use]
    pub const fn reverse(self) -> Self {
        self.direction(Direction::Reverse)
    }

    /// Same direction, no pagination.
    #[must_use]
    pub(crate) const fn unpaginated(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            direction: self.direction,
        }
    }
}

/// Applies `offset` then `limit` to an assembled list.
pub fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    let offset = offset.unwrap_or(0);
    let limit = limit.unwrap_or(usize::MAX);
    if offset == 0 && limit >= items.len() {
        return items;
    }
    items.into_iter().skip(offset).take(limit).collect()
}

/// Which unmatched records a join keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// Only matched pairs.
    #[default]
    Inner,
    /// Matched pairs plus unmatched left records.
    Left,
    /// Matched pairs plus unmatched right records.
    Right,
    /// Matched pairs plus unmatched records from both sides.
    Full,
}

impl JoinType {
    /// Whether unmatched left records are emitted.
    #[must_use]
    pub const fn keeps_left(self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    /// Whether unmatched right records are emitted.
    #[must_use]
    pub const fn keeps_right(self) -> bool {
        matches!(self, JoinType::Right | JoinType::Full)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
        };
        f.write_str(name)
    }
}

impl FromStr for JoinType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "full" => Ok(JoinType::Full),
            other => Err(CoreError::invalid_operation(format!(
                "unknown join type: {other}"
            ))),
        }
    }
}

/// The fields that pair records across a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    /// Pairing field on the left table.
    pub left_key: String,
    /// Pairing field on the right table.
    pub right_key: String,
}

impl JoinKeys {
    /// Creates join keys.
    pub fn new(left_key: impl Into<String>, right_key: impl Into<String>) -> Self {
        Self {
            left_key: left_key.into(),
            right_key: right_key.into(),
        }
    }
}

/// Options for joins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinOptions {
    /// Which unmatched records to keep.
    pub join_type: JoinType,
    /// Maximum number of output rows.
    pub limit: Option<usize>,
    /// Number of output rows to skip first.
    pub offset: Option<usize>,
}

impl JoinOptions {
    /// Options for a join of `join_type`.
    #[must_use]
    pub fn new(join_type: JoinType) -> Self {
        Self {
            join_type,
            ..Self::default()
        }
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Same pagination, different join type.
    #[must_use]
    pub const fn with_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }
}
