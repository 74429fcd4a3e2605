//! Error types shared by the gateway and its collaborators

use std::time::Duration;

use thiserror::Error;

/// Errors returned by an [`ObjectStore`](crate::ObjectStore) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The folder or named entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create-if-absent refused because the name is taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The store could not be reached or rejected the call
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its time budget
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// Local I/O failure inside the store implementation
    #[error("I/O error: {0}")]
    Io(String),

    /// The requested location is not addressable by this store
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl StoreError {
    /// Create a new NotFound error
    pub fn not_found(item: impl Into<String>) -> Self {
        Self::NotFound(item.into())
    }

    /// Create a new AlreadyExists error
    pub fn already_exists(item: impl Into<String>) -> Self {
        Self::AlreadyExists(item.into())
    }

    /// Create a new Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_) | Self::Io(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(err.to_string()),
            std::io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(err.to_string()),
            _ => StoreError::Io(err.to_string()),
        }
    }
}

/// Errors returned by an [`AllowlistSource`](crate::AllowlistSource)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllowlistError {
    /// The source could not be reached
    #[error("Allowlist source unreachable: {0}")]
    Unreachable(String),

    /// The fetch did not complete within its time budget
    #[error("Allowlist fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The source answered with data that is not an allowlist
    #[error("Malformed allowlist: {0}")]
    Malformed(String),
}

impl AllowlistError {
    /// Create a new Unreachable error
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }
}

impl From<std::io::Error> for AllowlistError {
    fn from(err: std::io::Error) -> Self {
        AllowlistError::Unreachable(err.to_string())
    }
}

/// Result type alias for object store operations
pub type StoreResult<T> = Result<T, StoreError>;
