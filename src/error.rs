//! Structured error types for repository operations.

use crate::document::DocumentError;
use crate::types::EntityKind;
use serde::Serialize;
use std::fmt;

/// Closed set of failure kinds that may cross from the repository layer into
/// the state stores.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Remote store failures
    FetchFailed,
    CreateFailed,
    UpdateFailed,
    DeleteFailed,

    // Update precondition did not hold
    Conflict,

    // Rejected at the input boundary
    ValidationFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FetchFailed => "FETCH_FAILED",
            ErrorKind::CreateFailed => "CREATE_FAILED",
            ErrorKind::UpdateFailed => "UPDATE_FAILED",
            ErrorKind::DeleteFailed => "DELETE_FAILED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
        }
    }
}

/// Structured error for repository operations.
#[derive(Debug, Serialize)]
pub struct RepoError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RepoError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn fetch_failed(entity: EntityKind, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::FetchFailed,
            format!("Failed to fetch {}", entity.plural()),
        )
        .with_details(err.to_string())
    }

    pub fn create_failed(entity: EntityKind, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::CreateFailed,
            format!("Failed to create {}", entity.singular()),
        )
        .with_details(err.to_string())
    }

    pub fn update_failed(entity: EntityKind, id: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::UpdateFailed,
            format!("Failed to update {} {}", entity.singular(), id),
        )
        .with_details(err.to_string())
    }

    pub fn delete_failed(entity: EntityKind, id: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::DeleteFailed,
            format!("Failed to delete {} {}", entity.singular(), id),
        )
        .with_details(err.to_string())
    }

    pub fn conflict(entity: EntityKind, id: &str) -> Self {
        Self::new(
            ErrorKind::Conflict,
            format!("{} {} was modified concurrently", entity.singular(), id),
        )
    }

    /// Map an update-path backend failure, keeping precondition failures
    /// distinct from transport failures.
    pub fn from_update(entity: EntityKind, id: &str, err: DocumentError) -> Self {
        match err {
            DocumentError::PreconditionFailed { .. } => Self::conflict(entity, id),
            other => Self::update_failed(entity, id, other),
        }
    }
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details {
            Some(ref details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RepoError {}

/// Result type for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::FetchFailed).unwrap();
        assert_eq!(json, "\"FETCH_FAILED\"");
        assert_eq!(ErrorKind::Conflict.as_str(), "CONFLICT");
    }

    #[test]
    fn test_precondition_maps_to_conflict() {
        let err = RepoError::from_update(
            EntityKind::Task,
            "t1",
            DocumentError::PreconditionFailed {
                collection: "tasks".into(),
                id: "t1".into(),
                field: "updatedAt".into(),
            },
        );
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err = RepoError::from_update(
            EntityKind::Task,
            "t1",
            DocumentError::Unavailable("offline".into()),
        );
        assert_eq!(err.kind, ErrorKind::UpdateFailed);
        assert_eq!(err.details.as_deref(), Some("document store unavailable: offline"));
    }

    #[test]
    fn test_display_includes_details() {
        let err = RepoError::create_failed(EntityKind::Project, "disk full");
        assert_eq!(err.to_string(), "Failed to create project: disk full");
    }
}
