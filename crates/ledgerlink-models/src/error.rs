//! Error types for the `ledgerlink-models` crate.
//!
//! All fallible constructors in this crate return variants of [`ModelError`].

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A username was empty or made only of whitespace.
    #[error("invalid username \"{value}\": {reason}")]
    InvalidUsername {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A token received from a client was empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },
}
