//! Error types for the object layer.

use persistkit_core::{CodecError, KeyValue, ObjectId, QueryError};
use persistkit_store::StoreError;
use thiserror::Error;

/// Errors that can occur during object operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A stored record could not be turned into a model, or the reverse.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The operation needs a primary key and the type declares none.
    #[error("{type_name} has no primary key")]
    NoPrimaryKey { type_name: &'static str },

    /// A predicate is malformed or cannot be evaluated.
    #[error("invalid query: {0}")]
    QueryInvalid(#[from] QueryError),

    /// The primary key field is missing or holds something other than an int or text.
    #[error("primary key field `{field}` of {type_name} must hold an int or text value")]
    MissingKeyValue {
        type_name: &'static str,
        field: &'static str,
    },

    /// An edit changed the object's primary key.
    #[error("the primary key of {type_name} cannot change in an edit")]
    PrimaryKeyChanged { type_name: &'static str },

    /// No object of the type has the key.
    #[error("no {type_name} with key {key}")]
    NotFound { type_name: &'static str, key: KeyValue },

    /// The object was deleted from the store.
    #[error("{type_name} {id} no longer exists")]
    Invalidated { type_name: &'static str, id: ObjectId },
}

impl PersistError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistError::Store(e) if e.is_retryable())
    }
}

/// Result type for object operations.
pub type Result<T> = std::result::Result<T, PersistError>;
