//! Error types for the artifact gateway
//!
//! Every failure a caller can see is one of five kinds. Each kind has a
//! distinct [`user_message`](GatewayError::user_message) that is safe to show
//! to an operator: authorization failures never mention folders, and remote
//! failures never echo store internals.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use vellum_core::StoreError;

use crate::gate::DenyReason;

/// The five externally visible error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PathValidation,
    Authorization,
    NotFound,
    VersionConflict,
    RemoteService,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PathValidation => "path_validation",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::VersionConflict => "version_conflict",
            Self::RemoteService => "remote_service",
        };
        f.write_str(name)
    }
}

/// Which logical identifier failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Category,
    ParticipantId,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category => f.write_str("category"),
            Self::ParticipantId => f.write_str("participant ID"),
        }
    }
}

/// Why an identifier was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("must not be empty")]
    Empty,

    #[error("is {len} bytes long, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("must not contain path separators")]
    PathSeparator,

    #[error("must not contain '..'")]
    ParentTraversal,

    #[error("must not contain control characters")]
    ControlCharacter,

    #[error("contains disallowed character {0:?}")]
    DisallowedCharacter(char),

    #[error("is not a configured category")]
    UnknownCategory,

    #[error("is listed more than once")]
    Duplicate,
}

/// A logical identifier that cannot be turned into a store path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {reason}")]
pub struct PathValidationError {
    pub field: Field,
    pub reason: ValidationReason,
}

impl PathValidationError {
    pub fn new(field: Field, reason: ValidationReason) -> Self {
        Self { field, reason }
    }
}

/// What could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundTarget {
    /// The resolved results folder does not exist
    Folder(String),
    /// A well-known artifact is missing from an existing folder
    Artifact { folder: String, name: String },
}

impl fmt::Display for NotFoundTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(folder) => write!(f, "folder {folder}"),
            Self::Artifact { folder, name } => write!(f, "artifact {name} in {folder}"),
        }
    }
}

/// Errors returned by the gateway surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Input rejected before any external call
    #[error(transparent)]
    PathValidation(#[from] PathValidationError),

    /// Principal is not permitted, or permission cannot be established
    #[error("Access denied: {reason}")]
    Authorization { reason: DenyReason },

    /// Folder or well-known artifact missing
    #[error("Not found: {0}")]
    NotFound(NotFoundTarget),

    /// Every candidate version was taken by concurrent writers
    #[error("Version conflict for {base_name} after {attempts} attempts")]
    VersionConflict { base_name: String, attempts: u32 },

    /// Store or allowlist collaborator failed, or a deadline expired
    #[error("Remote service error: {0}")]
    RemoteService(String),
}

impl GatewayError {
    /// Create a new RemoteService error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteService(message.into())
    }

    /// Create a NotFound error for a missing folder
    pub fn folder_not_found(folder: impl Into<String>) -> Self {
        Self::NotFound(NotFoundTarget::Folder(folder.into()))
    }

    /// Create a NotFound error for a missing artifact
    pub fn artifact_not_found(folder: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound(NotFoundTarget::Artifact {
            folder: folder.into(),
            name: name.into(),
        })
    }

    /// Wrap a store failure from the named operation
    pub fn from_store(op: &str, err: StoreError) -> Self {
        Self::RemoteService(format!("{op} failed: {err}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathValidation(_) => ErrorKind::PathValidation,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            Self::RemoteService(_) => ErrorKind::RemoteService,
        }
    }

    /// Message safe to show to the operator
    pub fn user_message(&self) -> String {
        match self {
            Self::PathValidation(e) => e.to_string(),
            Self::Authorization { reason } => match reason {
                DenyReason::NotListed | DenyReason::EmptyPrincipal => {
                    "You are not authorized to access participant data.".to_string()
                }
                DenyReason::AllowlistUnavailable | DenyReason::AllowlistStale => {
                    "Access cannot be verified right now. Please try again later.".to_string()
                }
            },
            Self::NotFound(NotFoundTarget::Folder(_)) => {
                "No results folder exists for this participant.".to_string()
            }
            Self::NotFound(NotFoundTarget::Artifact { name, .. }) => {
                format!("The results folder is missing {name}.")
            }
            Self::VersionConflict { .. } => {
                "Other edits were being saved at the same time. Please save again.".to_string()
            }
            Self::RemoteService(_) => {
                "The storage service is unavailable. Please try again later.".to_string()
            }
        }
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<GatewayError> {
        vec![
            PathValidationError::new(Field::ParticipantId, ValidationReason::ParentTraversal).into(),
            GatewayError::Authorization {
                reason: DenyReason::NotListed,
            },
            GatewayError::folder_not_found("ActiGraph/PID001/output_PID001/results/"),
            GatewayError::VersionConflict {
                base_name: "data.csv".into(),
                attempts: 9,
            },
            GatewayError::remote("503 from upstream at 10.0.0.7"),
        ]
    }

    #[test]
    fn test_kinds_are_distinct() {
        let kinds: Vec<_> = all_kinds().iter().map(GatewayError::kind).collect();
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let messages: Vec<_> = all_kinds().iter().map(GatewayError::user_message).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_user_messages_do_not_leak() {
        for reason in [
            DenyReason::NotListed,
            DenyReason::EmptyPrincipal,
            DenyReason::AllowlistUnavailable,
            DenyReason::AllowlistStale,
        ] {
            let msg = GatewayError::Authorization { reason }.user_message();
            assert!(!msg.contains('/'));
            assert!(!msg.to_lowercase().contains("folder"));
        }

        let msg = GatewayError::folder_not_found("ActiGraph/PID001/output_PID001/results/")
            .user_message();
        assert!(!msg.contains("ActiGraph"));

        let msg = GatewayError::remote("503 from upstream at 10.0.0.7").user_message();
        assert!(!msg.contains("10.0.0.7"));
    }

    #[test]
    fn test_validation_display_names_field() {
        let err = PathValidationError::new(Field::Category, ValidationReason::UnknownCategory);
        assert_eq!(err.to_string(), "Invalid category: is not a configured category");

        let err = PathValidationError::new(
            Field::ParticipantId,
            ValidationReason::TooLong { len: 200, max: 128 },
        );
        assert!(err.to_string().contains("participant ID"));
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_store_error_wrapping() {
        let err = GatewayError::from_store("list", StoreError::unavailable("timeout"));
        assert_eq!(err.kind(), ErrorKind::RemoteService);
        assert!(err.to_string().contains("list failed"));
    }
}
