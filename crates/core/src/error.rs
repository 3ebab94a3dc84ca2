//! Error types for the Skein cache.
//!
//! Missing or incomplete data is never an error: it is reported through the
//! `partial` flag of a read. The variants here cover structural misuse that
//! callers are expected to fix.

use thiserror::Error;

/// Result type alias for Skein operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for cache operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// An abstract field's payload carried no `__typename`.
    #[error("Encountered abstract field {field} without __typename in the payload")]
    MissingTypename { field: String },

    /// No list has been registered under this name.
    #[error("Cannot find list with name: {name}")]
    UnknownList { name: String },

    /// A value used in a list operation carries none of its type's key fields.
    #[error("Cannot compute an identifier for a value of type {typename}")]
    Unidentifiable { typename: String },

    /// Cache configuration failed to parse or validate.
    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    /// A selection artifact failed to deserialize.
    #[error("Invalid selection: {message}")]
    InvalidSelection { message: String },
}

impl Error {
    /// Creates a missing typename error.
    pub fn missing_typename(field: impl Into<String>) -> Self {
        Error::MissingTypename {
            field: field.into(),
        }
    }

    /// Creates an unknown list error.
    pub fn unknown_list(name: impl Into<String>) -> Self {
        Error::UnknownList { name: name.into() }
    }

    /// Creates an unidentifiable value error.
    pub fn unidentifiable(typename: impl Into<String>) -> Self {
        Error::Unidentifiable {
            typename: typename.into(),
        }
    }

    /// Creates an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid selection error.
    pub fn invalid_selection(message: impl Into<String>) -> Self {
        Error::InvalidSelection {
            message: message.into(),
        }
    }
}
