use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification of a failed backend call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MutationErrorKind {
    /// Network failure or timeout.
    Transport,
    /// The server rejected the content (e.g. empty after trimming).
    Validation,
    /// The request conflicts with current server state
    /// (e.g. deleting an already-deleted message).
    Conflict,
    /// The target no longer exists on the server.
    NotFound,
}

/// Error returned by a backend fetch or mutation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct MutationError {
    pub kind: MutationErrorKind,
    pub message: String,
}

impl MutationError {
    pub fn new(kind: MutationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::Transport, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::NotFound, message)
    }

    /// Whether a failed send should stay in the feed awaiting user retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            MutationErrorKind::Transport | MutationErrorKind::Validation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(MutationError::transport("timeout").is_retryable());
        assert!(MutationError::validation("empty").is_retryable());
        assert!(!MutationError::conflict("already deleted").is_retryable());
        assert!(!MutationError::not_found("gone").is_retryable());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = MutationError::conflict("already deleted");
        assert_eq!(err.to_string(), "Conflict: already deleted");
    }
}
