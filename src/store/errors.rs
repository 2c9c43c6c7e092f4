//! Store error types
//!
//! One taxonomy shared by every backend so callers can match on the failure
//! without knowing which medium produced it.

use std::io;

use crate::s3::ObjectError;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Connection error: {0}")]
    Connectivity(String),

    #[error("Invalid JSON in file {id}: {message}")]
    Decode { id: String, message: String },

    #[error("Cannot serialize data to JSON: {0}")]
    Serialize(String),

    #[error("I/O error on {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Backend(#[from] ObjectError),
}

impl StoreError {
    /// Map a filesystem error for `id` onto the store taxonomy
    pub fn from_io(id: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(format!("File not found: {}", id)),
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied(format!(
                "Permission denied when accessing file: {}",
                id
            )),
            _ => StoreError::Io {
                id: id.to_string(),
                source: err,
            },
        }
    }

    /// Create a Decode error tagged with the failing identifier
    pub fn decode(id: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Decode {
            id: id.to_string(),
            message: err.to_string(),
        }
    }

    /// Short message suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NotFound(msg) => format!("Nothing found: {}", msg),
            StoreError::PermissionDenied(msg) => {
                format!("Access denied. Check credentials and permissions ({})", msg)
            }
            StoreError::Connectivity(msg) => {
                format!("Storage is unreachable right now, try again ({})", msg)
            }
            other => other.to_string(),
        }
    }
}
