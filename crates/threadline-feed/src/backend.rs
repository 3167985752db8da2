//! The remote collaborator the feed consumes: paginated fetch plus the
//! three mutation calls. Transport, auth and retry/backoff live behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use threadline_shared::{ActorId, ConversationId, Draft, Message, MessageId, MutationError};

/// One page of authoritative messages.
///
/// Messages inside a page are in chronological order. Page `0` is the most
/// recent window; higher page numbers reach further back in history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedPage {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

#[async_trait]
pub trait FeedBackend: Send + Sync {
    async fn fetch_page(
        &self,
        conversation: ConversationId,
        page: u32,
        page_size: u16,
    ) -> Result<FeedPage, MutationError>;

    async fn create_message(
        &self,
        conversation: ConversationId,
        draft: &Draft,
    ) -> Result<Message, MutationError>;

    /// Add (`add == true`) or remove `actor`'s `emoji` reaction on `message`.
    async fn toggle_reaction(
        &self,
        message: MessageId,
        emoji: &str,
        actor: &ActorId,
        add: bool,
    ) -> Result<(), MutationError>;

    async fn delete_message(&self, message: MessageId) -> Result<(), MutationError>;
}
