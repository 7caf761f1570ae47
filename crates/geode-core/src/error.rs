//! # Error Hierarchy
//!
//! Validation errors for geode domain primitives, built with `thiserror`.

use thiserror::Error;

/// A domain primitive failed validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value does not parse as a UUID.
    #[error("invalid user id {value:?}: {reason}")]
    InvalidUserId {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The value parses, but is the nil UUID.
    #[error("user id must not be the nil UUID")]
    NilUserId,
}
