//! Store-specific error types.

use std::error::Error;
use std::fmt;

use thaw_core::{CompositeSpace, FieldKey, ThawError};

/// Errors that can occur during field store operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The key was never declared.
    NotFound {
        /// The unknown key.
        key: FieldKey,
    },
    /// A declaration or write disagrees with the shape on record.
    ShapeMismatch {
        /// The field concerned.
        key: FieldKey,
        /// Shape on record.
        expected: CompositeSpace,
        /// Shape offered.
        found: CompositeSpace,
    },
    /// A second writer claimed a key that already has an owner.
    DuplicateOwner {
        /// The contested key.
        key: FieldKey,
        /// Owner on record.
        first: String,
        /// Rejected claimant.
        second: String,
    },
    /// A write by someone other than the key's owner.
    NotWritable {
        /// The field that was not writable.
        key: FieldKey,
        /// Owner on record, if any.
        owner: Option<String>,
        /// Who attempted the write.
        writer: String,
    },
    /// Two vectors combined entry-wise have different shapes.
    IncompatibleVectors {
        /// Shape of the receiving vector.
        expected: CompositeSpace,
        /// Shape of the argument.
        found: CompositeSpace,
    },
    /// The field's data is checked out for writing and cannot be read.
    CheckedOut {
        /// The field concerned.
        key: FieldKey,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "field '{key}' was never declared"),
            Self::ShapeMismatch {
                key,
                expected,
                found,
            } => write!(f, "field '{key}' has shape {expected}, requested {found}"),
            Self::DuplicateOwner { key, first, second } => write!(
                f,
                "field '{key}' is owned by '{first}', cannot be claimed by '{second}'"
            ),
            Self::NotWritable { key, owner, writer } => match owner {
                Some(owner) => write!(
                    f,
                    "field '{key}' is owned by '{owner}', not writable by '{writer}'"
                ),
                None => write!(f, "field '{key}' has no owner, not writable by '{writer}'"),
            },
            Self::IncompatibleVectors { expected, found } => {
                write!(f, "incompatible vectors: {expected} and {found}")
            }
            Self::CheckedOut { key } => write!(f, "field '{key}' is checked out"),
        }
    }
}

impl Error for StoreError {}

impl From<StoreError> for ThawError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { key } => Self::NotFound {
                key: key.to_string(),
            },
            StoreError::ShapeMismatch {
                key,
                expected,
                found,
            } => Self::ShapeMismatch {
                key: key.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            },
            StoreError::DuplicateOwner { key, first, second } => {
                Self::DuplicateOwner { key, first, second }
            }
            StoreError::NotWritable { key, owner, writer } => Self::DuplicateOwner {
                key,
                first: owner.unwrap_or_else(|| "no owner".into()),
                second: writer,
            },
            StoreError::IncompatibleVectors { expected, found } => Self::ShapeMismatch {
                key: String::from("vector operand"),
                expected: expected.to_string(),
                found: found.to_string(),
            },
            StoreError::CheckedOut { key } => Self::NotReady {
                what: format!("field '{key}' is being computed"),
            },
        }
    }
}
