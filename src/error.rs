// Directory error types
use thiserror::Error;

use crate::store::StoreError;

/// Failure of a directory operation.
///
/// Expected "nothing to do" outcomes (re-adding a member, removing someone who
/// already left) are not errors; operations report them as `Ok(false)`.
#[derive(Debug, Error)]
pub enum DirectoryError {
    // Referenced user, group or event does not exist
    #[error("{0}")]
    NotFound(String),

    // Malformed email, short password, empty field, unknown category
    #[error("{0}")]
    InvalidInput(String),

    // Duplicate registration or group-id collision
    #[error("{0}")]
    Conflict(String),

    // Actor lacks the organizer role for the action
    #[error("{0}")]
    AuthorizationDenied(String),

    // The store call itself failed; surfaced, never retried here
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DirectoryError {
    pub fn not_found(message: impl Into<String>) -> Self {
        DirectoryError::NotFound(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        DirectoryError::InvalidInput(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DirectoryError::Conflict(message.into())
    }

    pub fn authorization_denied(message: impl Into<String>) -> Self {
        DirectoryError::AuthorizationDenied(message.into())
    }

    /// Stable code for callers that map errors onto their own surface
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::NotFound(_) => "NOT_FOUND",
            DirectoryError::InvalidInput(_) => "INVALID_INPUT",
            DirectoryError::Conflict(_) => "CONFLICT",
            DirectoryError::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            DirectoryError::Store(_) => "STORE_UNAVAILABLE",
        }
    }

    /// True when the failure came from the backend rather than the request
    pub fn is_store_failure(&self) -> bool {
        matches!(self, DirectoryError::Store(_))
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
