//! Error types for `oxbridge`.
//!
//! Dispatch itself never returns errors: missing classes and unanswered
//! selectors surface as `Option`s. The variants here cover the few fallible
//! construction paths, registering names and declaring host classes.

use std::fmt;

/// Errors that can occur while registering identifiers or classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The name contains an interior NUL byte and cannot cross the C boundary.
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A class with this name is already registered.
    ClassAlreadyExists {
        /// The duplicate class name.
        name: String,
    },

    /// The named superclass is not registered.
    UnknownSuperclass {
        /// The missing superclass name.
        name: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidName { name } => {
                write!(f, "Invalid name {name:?}: contains a NUL byte")
            }
            Error::ClassAlreadyExists { name } => {
                write!(f, "Class {name} already exists in registry")
            }
            Error::UnknownSuperclass { name } => {
                write!(f, "Superclass {name} is not registered")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `oxbridge` operations.
pub type Result<T> = std::result::Result<T, Error>;
