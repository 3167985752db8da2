use thiserror::Error;

use threadline_shared::{ActorId, LocalId, MessageId, MutationError};

/// Errors returned synchronously to the caller of a conversation operation.
///
/// Backend failures of individual mutations are *not* reported here; they
/// end up in the pending table (failed sends) or are rolled back, and are
/// reported through [`crate::Outcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The conversation was closed; its tables are gone.
    #[error("Conversation is closed")]
    ConversationClosed,

    #[error("No pending operation with id {0}")]
    UnknownOperation(LocalId),

    /// Retry or discard was requested for an operation that is not a failed send.
    #[error("Operation {0} is not a failed send")]
    NotFailed(LocalId),

    #[error("Reaction {emoji} by {actor} on {message} is already in flight")]
    ReactionInFlight {
        message: MessageId,
        emoji: String,
        actor: ActorId,
    },

    #[error("Delete of {0} is already in flight")]
    DeleteInFlight(MessageId),

    #[error("Message {0} is not in the loaded feed")]
    UnknownMessage(MessageId),

    #[error("Feed fetch failed: {0}")]
    Fetch(#[from] MutationError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;
