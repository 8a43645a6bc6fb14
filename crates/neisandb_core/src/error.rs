//! Error types for NeisanDB core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in NeisanDB core operations.
///
/// These are engine faults: I/O problems, corrupt bytes, broken
/// configuration. Refused writes (validation, uniqueness, no-match) are
/// not errors; they are reported through
/// [`WriteOutcome::Rejected`](crate::WriteOutcome::Rejected) so callers
/// can retry without string-matching error text.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] neisandb_codec::CodecError),

    /// An encoded page tree does not fit in a page.
    ///
    /// This indicates misconfiguration (tree capacity too large for the
    /// page size) and must surface rather than truncate.
    #[error("encoded page ({encoded_len} bytes) exceeds page payload capacity ({max} bytes)")]
    PageOverflow {
        /// Length of the encoded tree.
        encoded_len: usize,
        /// Maximum payload bytes a page can hold.
        max: usize,
    },

    /// A page decoded to something that is not a page tree.
    #[error("corrupt page at byte {position}: {message}")]
    CorruptPage {
        /// Byte offset of the page in the file.
        position: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument issue.
        message: String,
    },

    /// A stored document could not be mapped into the model type.
    #[error("model decode failed: {message}")]
    ModelDecode {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a corrupt page error.
    pub fn corrupt_page(position: u64, message: impl Into<String>) -> Self {
        Self::CorruptPage {
            position,
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a model decode error.
    pub fn model_decode(message: impl Into<String>) -> Self {
        Self::ModelDecode {
            message: message.into(),
        }
    }
}

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = std::collections::BTreeMap<String, String>;

/// A refused write.
///
/// Mutating operations return `CoreResult<WriteOutcome<T>>`: the outer
/// `Result` carries engine faults, the outcome distinguishes applied
/// writes from refusals the caller can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The schema rejected the payload.
    Validation(FieldErrors),

    /// A unique field would collide with a live record.
    UniqueConflict {
        /// The conflicting field name.
        field: String,
    },

    /// The search matched no document.
    NoMatch,

    /// The caller's updater refused the record.
    Updater(String),
}

impl Rejection {
    /// Renders the rejection as a field-to-message map.
    ///
    /// Non-field failures use the `general` key; the message strings
    /// match what API consumers pattern their retry logic against.
    pub fn errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self {
            Rejection::Validation(fields) => errors.clone_from(fields),
            Rejection::UniqueConflict { field } => {
                errors.insert(field.clone(), "Conflict as unique key".to_string());
            }
            Rejection::NoMatch => {
                errors.insert("general".to_string(), "No Document Matches".to_string());
            }
            Rejection::Updater(message) => {
                errors.insert("general".to_string(), message.clone());
            }
        }
        errors
    }
}

/// Outcome of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    /// The write was applied; carries the resulting instance(s).
    Written(T),
    /// The write was refused.
    Rejected(Rejection),
}

impl<T> WriteOutcome<T> {
    /// Returns the written value, panicking on rejection.
    ///
    /// Intended for tests and examples where a rejection is a bug.
    #[track_caller]
    pub fn unwrap_written(self) -> T {
        match self {
            WriteOutcome::Written(value) => value,
            WriteOutcome::Rejected(rejection) => {
                panic!("write rejected: {:?}", rejection.errors())
            }
        }
    }

    /// Returns the rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            WriteOutcome::Written(_) => None,
            WriteOutcome::Rejected(rejection) => Some(rejection),
        }
    }

    /// Returns true if the write was applied.
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_conflict_errors_keyed_by_field() {
        let rejection = Rejection::UniqueConflict {
            field: "email".to_string(),
        };
        let errors = rejection.errors();
        assert_eq!(errors.get("email").unwrap(), "Conflict as unique key");
    }

    #[test]
    fn no_match_uses_general_key() {
        let errors = Rejection::NoMatch.errors();
        assert_eq!(errors.get("general").unwrap(), "No Document Matches");
    }

    #[test]
    fn validation_errors_pass_through() {
        let mut fields = FieldErrors::new();
        fields.insert("attempts".to_string(), "must be >= 0".to_string());
        let errors = Rejection::Validation(fields.clone()).errors();
        assert_eq!(errors, fields);
    }

    #[test]
    fn outcome_accessors() {
        let written: WriteOutcome<u32> = WriteOutcome::Written(7);
        assert!(written.is_written());
        assert!(written.rejection().is_none());
        assert_eq!(written.unwrap_written(), 7);

        let rejected: WriteOutcome<u32> = WriteOutcome::Rejected(Rejection::NoMatch);
        assert!(!rejected.is_written());
        assert_eq!(rejected.rejection(), Some(&Rejection::NoMatch));
    }
}
