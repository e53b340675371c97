//! Error types for command registration and execution.

use thiserror::Error;

use crate::protocol::ErrorClass;

/// Errors raised while building or querying the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A command with the same name is already registered.
    #[error("command '{name}' is already registered")]
    Duplicate { name: String },
    /// Command names must be non-empty.
    #[error("command names must not be empty")]
    EmptyName,
    /// No command with this name is registered.
    #[error("command '{name}' is not registered")]
    NotFound { name: String },
}

/// Failure reported by a command handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A required argument was absent.
    #[error("parameter '{name}' is missing")]
    MissingParameter { name: String },
    /// An argument had the wrong JSON type or value.
    #[error("parameter '{name}' expects {expected}")]
    InvalidParameter { name: String, expected: String },
    /// The argument map as a whole did not match the command's schema.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },
    /// The command ran but failed.
    #[error("{message}")]
    Failed { message: String },
}

impl CommandError {
    /// Creates a generic command failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates a parameter type error.
    pub fn invalid_parameter(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            expected: expected.into(),
        }
    }

    /// Wire error class for this failure.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::MissingParameter { .. }
            | Self::InvalidParameter { .. }
            | Self::InvalidArguments { .. } => ErrorClass::InvalidParameter,
            Self::Failed { .. } => ErrorClass::GenericError,
        }
    }
}
