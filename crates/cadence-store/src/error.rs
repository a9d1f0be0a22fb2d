use thiserror::Error;

/// Errors that can occur while reading or writing task records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task with the given ID exists in the store.
    #[error("task not found: {id}")]
    NotFound { id: String },

    /// Underlying SQLite / rusqlite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A value does not fit the column it is stored in.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u64 },

    /// A stored JSON column could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
