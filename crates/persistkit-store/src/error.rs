//! Error types for the store module.

use std::thread::ThreadId;

use persistkit_core::{KeyValue, ObjectId};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be opened or created.
    #[error("store unavailable at {location}: {reason}")]
    StoreUnavailable { location: String, reason: String },

    /// A write transaction could not begin or commit. Safe to retry.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// An insert-only write collided with an existing primary key.
    #[error("duplicate key {key} for type {type_name}")]
    DuplicateKey { type_name: String, key: KeyValue },

    /// The operation was issued off the handle's bound thread.
    #[error("wrong context: handle is bound to thread {expected:?}, called from {actual:?}")]
    WrongContext { expected: ThreadId, actual: ThreadId },

    /// The calling thread already holds a write transaction on this handle.
    #[error("a write transaction is already open on this handle in the current thread")]
    NestedWrite,

    /// A stored record could not be decoded.
    #[error("corrupt record for object {object_id}: {reason}")]
    CorruptRecord { object_id: ObjectId, reason: String },

    /// A record could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn unavailable(location: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        StoreError::StoreUnavailable {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Classify an error raised while beginning, running or committing a write.
    ///
    /// Contention and read-only conditions become [`StoreError::TransactionFailed`].
    pub(crate) fn from_write(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::ReadOnly
                | ErrorCode::DiskFull
                | ErrorCode::SystemIoFailure,
            ) => StoreError::TransactionFailed(err.to_string()),
            _ => StoreError::Database(err),
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::TransactionFailed(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
