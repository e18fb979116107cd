use thiserror::Error;

/// Errors that can occur during table store operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// A table with this name already exists in the database.
    #[error("{0} is already an existing table name in the database")]
    DuplicateTableName(String),

    /// An argument does not have the expected shape (e.g., a frame whose rows
    /// do not match its columns, or a blank table name).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An error raised by SQLite itself, passed through untouched.
    #[error(transparent)]
    Engine(#[from] rusqlite::Error),

    /// The requested table does not exist.
    #[error("{0} is not a table in the current database.")]
    TableNotFound(String),
}

impl From<serde_json::Error> for TableError {
    fn from(e: serde_json::Error) -> Self {
        TableError::InvalidInput(e.to_string())
    }
}
