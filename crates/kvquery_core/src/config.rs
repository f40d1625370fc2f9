//! Query layer configuration.

use kvquery_storage::Direction;

/// Configuration for a [`crate::Database`].
///
/// Table definitions belong to the backend
/// ([`kvquery_storage::DatabaseConfig`]); this only tunes the query layer.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Scan direction used when a call does not pick one.
    pub default_direction: Direction,
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default scan direction.
    #[must_use]
    pub const fn default_direction(mut self, direction: Direction) -> Self {
        self.default_direction = direction;
        self
    }
}
