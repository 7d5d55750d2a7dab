//! Error types for persistkit core.

use thiserror::Error;

use crate::array::ElementType;

/// Errors raised while converting values to and from their stored shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// A stored array did not match the shape a bridged type expects.
    #[error("malformed bridged value for {type_name}: {reason}")]
    MalformedBridgedValue {
        type_name: &'static str,
        reason: String,
    },

    /// An ordered primitive array was built from elements of different types.
    #[error("mixed element types: expected {expected}, found {found} at index {index}")]
    MixedElementTypes {
        expected: ElementType,
        found: ElementType,
        index: usize,
    },

    /// A record is missing a field the reader asked for.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A record field holds a different kind of value than expected.
    #[error("field {field} has type {found}, expected {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl CodecError {
    /// Shorthand for a [`CodecError::MalformedBridgedValue`].
    pub fn malformed(type_name: &'static str, reason: impl Into<String>) -> Self {
        CodecError::MalformedBridgedValue {
            type_name,
            reason: reason.into(),
        }
    }
}

/// Errors raised while validating or evaluating a [`Predicate`](crate::query::Predicate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("empty field path")]
    EmptyField,

    #[error("`{0}` requires at least one operand")]
    EmptyCombinator(&'static str),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("cannot apply {op} to field {field}: {reason}")]
    Incomparable {
        field: String,
        op: &'static str,
        reason: String,
    },
}
