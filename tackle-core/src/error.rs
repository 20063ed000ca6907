use crate::ObjectName;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy of the toolkit.
///
/// Everything is raised synchronously at the point of detection: SQL
/// generation errors surface before any connection is opened, materialization
/// errors after the cursor was consumed. Nothing is retried internally, and
/// cancellation is its own variant so callers can always tell it apart from a
/// failure.
#[derive(Error, Debug)]
pub enum Error {
    /// The named table, view, procedure or function does not exist.
    #[error("unknown database object `{0}`")]
    MissingObject(ObjectName),

    /// Zero rows were returned where exactly one was required.
    #[error("no rows were returned, exactly one was expected")]
    MissingData,

    /// More rows or columns than the row policy allows, or a NULL bound to a
    /// non-nullable target.
    #[error("unexpected data: {0}")]
    UnexpectedData(String),

    /// Ambiguous or absent constructor, unresolvable binding, decomposition
    /// target mismatch.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// An argument was rejected by a validation hook.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Strict mode: an argument property has no matching column.
    #[error("strict mode: property `{property}` has no matching column in `{object}`")]
    StrictMode {
        property: String,
        object: ObjectName,
    },

    /// The operation observed a cancellation request. Never wrapped as a
    /// generic failure.
    #[error("the operation was canceled")]
    Canceled,

    /// Transport or driver failure, passed through from the executor.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl Error {
    pub fn unexpected_null(column: &str) -> Self {
        Self::UnexpectedData(format!(
            "column `{column}` holds NULL but the target is not nullable"
        ))
    }

    pub fn unexpected_row_count(rows: usize) -> Self {
        Self::UnexpectedData(format!("the query returned {rows} rows, expected at most 1"))
    }

    /// Projection became empty after desired-column intersection, on a table
    /// that does have columns.
    pub fn empty_projection(object: &ObjectName) -> Self {
        Self::Mapping(format!(
            "desired columns produced an empty projection for `{object}`"
        ))
    }

    /// The table itself has no columns, as opposed to an over-restricted
    /// projection.
    pub fn no_columns(object: &ObjectName) -> Self {
        Self::Mapping(format!("`{object}` has no columns"))
    }

    pub fn keys_not_resolved(object: &ObjectName) -> Self {
        Self::Mapping(format!(
            "no key columns could be resolved for `{object}`; a by-key operation needs override keys, entity keys or a metadata primary key"
        ))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}
