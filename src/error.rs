//! Error types for the Sleeper league importer

use thiserror::Error;


pub type Result<T> = std::result::Result<T, SleeperError>;

#[derive(Error, Debug)]
pub enum SleeperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid {kind} id: {value:?}")]
    InvalidId { kind: &'static str, value: String },

    #[error("Transaction {transaction_id} has unknown type {kind:?}")]
    UnknownTransactionType {
        transaction_id: String,
        kind: String,
    },

    #[error("Invalid epoch-millisecond timestamp for {field}: {millis}")]
    InvalidTimestamp { field: &'static str, millis: i64 },

    #[error("Roster {roster_id} is owned by {owner_id:?} but was paired with user {user_id}")]
    OwnerMismatch {
        roster_id: String,
        owner_id: Option<String>,
        user_id: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl SleeperError {
    /// True for constraint violations raised while saving a record.
    ///
    /// These are recoverable per record; every other database error is fatal.
    pub fn is_persistence_conflict(&self) -> bool {
        match self {
            SleeperError::Database(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}
