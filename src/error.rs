//! Error types for tagging operations.

use thiserror::Error;

/// Result type alias using the crate's [`TaggingError`].
pub type Result<T> = std::result::Result<T, TaggingError>;

/// Errors raised while building queries or reconciling tag associations.
///
/// Parsing and query building never fail on content: blank input yields an
/// empty list and an empty tag set yields [`crate::SearchPlan::NoMatch`].
#[derive(Debug, Error)]
pub enum TaggingError {
    /// Underlying SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A tag name was blank after trimming.
    #[error("Invalid tag name: {0:?}")]
    InvalidTagName(String),

    /// Mutually exclusive or otherwise ambiguous options were combined.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Concurrent creation of the same tag could not be resolved by retrying.
    #[error("Tag {name:?} could not be created after {attempts} attempts")]
    TagConflict { name: String, attempts: u32 },

    /// An aggregate count came back as something other than a non-negative number.
    #[error("Invalid tag count: {0}")]
    InvalidCount(String),

    /// A stored timestamp was outside the representable range.
    #[error("Timestamp error: {0}")]
    Timestamp(#[from] time::error::ComponentRange),

    /// The host's own save step failed inside the reconciliation transaction.
    #[error("Save failed: {0}")]
    Save(#[source] anyhow::Error),
}

impl TaggingError {
    /// Returns true for unique-constraint violations reported by SQLite.
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}
