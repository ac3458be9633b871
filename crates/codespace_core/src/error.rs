use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Unified error type for codespace operations
#[derive(Debug, Error)]
pub enum CodespaceError {
    // Lookup errors
    #[error("Codespace '{0}' not found")]
    SpaceNotFound(String),

    #[error("File '{file}' not found in codespace '{space}'")]
    FileNotFound { space: String, file: String },

    // Access errors
    #[error("Incorrect passcode.")]
    Unauthorized,

    #[error("Connection is not a member of codespace '{0}'")]
    NotJoined(String),

    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("A file named '{file}' already exists in codespace '{space}'")]
    FileExists { space: String, file: String },

    // Persistence errors
    #[error("Failed to persist '{file}' in codespace '{space}': {reason}")]
    StoreWrite {
        space: String,
        file: String,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    // Terminal errors
    #[error("Command not allowed: '{0}'")]
    DisallowedCommand(String),
}

/// Result type alias for codespace operations
pub type Result<T> = std::result::Result<T, CodespaceError>;

/// Error category sent to clients over the realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    ValidationError,
    FileExists,
    StoreWriteFailure,
    DisallowedCommand,
    Internal,
}

impl CodespaceError {
    /// Category of this error as seen by clients
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodespaceError::SpaceNotFound(_) | CodespaceError::FileNotFound { .. } => {
                ErrorKind::NotFound
            }
            CodespaceError::Unauthorized | CodespaceError::NotJoined(_) => ErrorKind::Unauthorized,
            CodespaceError::Validation(_) => ErrorKind::ValidationError,
            CodespaceError::FileExists { .. } => ErrorKind::FileExists,
            CodespaceError::StoreWrite { .. } => ErrorKind::StoreWriteFailure,
            CodespaceError::Storage(_) => ErrorKind::Internal,
            CodespaceError::DisallowedCommand(_) => ErrorKind::DisallowedCommand,
        }
    }

    /// Convert to a serializable representation for the wire
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }

    /// Shorthand for a validation failure on a required field
    pub fn missing(field: &str) -> Self {
        CodespaceError::Validation(format!("'{}' is required", field))
    }
}

/// A serializable representation of CodespaceError
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SerializableError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl From<&CodespaceError> for SerializableError {
    fn from(err: &CodespaceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<CodespaceError> for SerializableError {
    fn from(err: CodespaceError) -> Self {
        SerializableError::from(&err)
    }
}
