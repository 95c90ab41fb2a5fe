/// Result type alias for schema and gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// A table that already exists is not an error; see
/// [`Execution::DuplicateSkipped`](crate::Execution::DuplicateSkipped).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed field `{name}` on table `{table}`: {reason}")]
    MalformedField {
        table: String,
        name: String,
        reason: &'static str,
    },

    #[error("Table `{table}` expects {expected} values, got {found}")]
    ArityMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("Table does not exist: {0}")]
    UnknownTable(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
