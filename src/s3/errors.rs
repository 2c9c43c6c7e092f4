//! Object store error types
//!
//! Structured error handling for bucket operations.
//! Maps S3 error codes and HTTP status codes to the variants the stores translate.

/// Object store error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request error: {0}")]
    Request(String),
}

impl ObjectError {
    /// Whether the bucket or key is missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectError::NotFound(_))
    }

    /// Whether the caller lacks access
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ObjectError::Forbidden(_))
    }

    /// Create an ObjectError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            403 => ObjectError::Forbidden(body.to_string()),
            404 => ObjectError::NotFound(body.to_string()),
            500..=599 => ObjectError::Server(status, body.to_string()),
            _ => ObjectError::Request(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Create an ObjectError from an S3 error code, falling back to the status
    ///
    /// HEAD requests carry no body, so `code` is often absent and the status decides.
    pub fn from_response(code: Option<&str>, status: Option<u16>, message: &str) -> Self {
        match code {
            Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => {
                ObjectError::NotFound(message.to_string())
            }
            Some("AccessDenied" | "Forbidden" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
                ObjectError::Forbidden(message.to_string())
            }
            _ => match status {
                Some(status) => ObjectError::from_status(status, message),
                None => ObjectError::Network(message.to_string()),
            },
        }
    }
}
