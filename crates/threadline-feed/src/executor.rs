//! Runs the backend call for exactly one pending operation and settles its
//! table entry.
//!
//! Calls for independent operations run concurrently; nothing here holds
//! the state lock across an `.await`. The only serialization is at enqueue
//! time: a second reaction for the same (message, emoji, actor) triple, or
//! a second delete of the same message, is refused while the first is in
//! flight.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use threadline_shared::{ActorId, ConversationId, Draft, LocalId, MessageId, MutationError};

use crate::backend::FeedBackend;
use crate::error::{FeedError, Result};
use crate::pending::{
    PendingDelete, PendingOperation, PendingReaction, PendingSend, ReactionAction, SendStatus,
};
use crate::state::Shared;

/// How one executed operation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The server accepted the operation and its entry was removed.
    /// `message` is the server id of a newly created message.
    Committed {
        local_id: LocalId,
        message: Option<MessageId>,
    },
    /// A send failed; the entry stays in the table awaiting retry or discard.
    Failed {
        local_id: LocalId,
        error: MutationError,
    },
    /// A reaction or delete failed; its entry was removed.
    RolledBack {
        local_id: LocalId,
        error: MutationError,
    },
    /// The result arrived after the entry was superseded, discarded, or the
    /// conversation was closed.
    Discarded { local_id: LocalId },
}

impl Outcome {
    pub fn local_id(&self) -> LocalId {
        match self {
            Outcome::Committed { local_id, .. }
            | Outcome::Failed { local_id, .. }
            | Outcome::RolledBack { local_id, .. }
            | Outcome::Discarded { local_id } => *local_id,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }
}

#[derive(Clone)]
pub struct OperationExecutor {
    conversation: ConversationId,
    pub(crate) shared: Arc<Shared>,
    backend: Arc<dyn FeedBackend>,
}

impl OperationExecutor {
    pub(crate) fn new(
        conversation: ConversationId,
        shared: Arc<Shared>,
        backend: Arc<dyn FeedBackend>,
    ) -> Self {
        Self {
            conversation,
            shared,
            backend,
        }
    }

    // -----------------------------------------------------------------------
    // Enqueue (optimistic, synchronous)
    // -----------------------------------------------------------------------

    pub fn enqueue_send(&self, draft: Draft) -> Result<LocalId> {
        self.shared.update(|state| {
            let id = state
                .pending
                .add(PendingOperation::Send(PendingSend::new(draft)));
            debug!(local_id = %id, "Queued send");
            Ok(id)
        })
    }

    pub fn enqueue_reaction(
        &self,
        message: MessageId,
        emoji: &str,
        actor: &ActorId,
        action: ReactionAction,
    ) -> Result<LocalId> {
        self.shared.update(|state| {
            if state.pending.reaction_in_flight(message, emoji, actor) {
                return Err(FeedError::ReactionInFlight {
                    message,
                    emoji: emoji.to_string(),
                    actor: actor.clone(),
                });
            }
            let id = state.pending.add(PendingOperation::Reaction(PendingReaction {
                message,
                emoji: emoji.to_string(),
                action,
                actor: actor.clone(),
            }));
            debug!(local_id = %id, message_id = %message, emoji, ?action, "Queued reaction");
            Ok(id)
        })
    }

    /// Queue the reaction change that flips `actor`'s current state for
    /// `emoji` on `message`: remove if present in the feed, add otherwise.
    pub fn enqueue_toggle(
        &self,
        message: MessageId,
        emoji: &str,
        actor: &ActorId,
    ) -> Result<LocalId> {
        let action = self.shared.inspect(|state| -> Result<ReactionAction> {
            let target = state
                .feed
                .find(message)
                .ok_or(FeedError::UnknownMessage(message))?;
            let present = target.reaction(emoji).is_some_and(|r| r.contains(actor));
            Ok(if present {
                ReactionAction::Remove
            } else {
                ReactionAction::Add
            })
        })??;
        self.enqueue_reaction(message, emoji, actor, action)
    }

    pub fn enqueue_delete(&self, message: MessageId) -> Result<LocalId> {
        self.shared.update(|state| {
            if state.pending.delete_in_flight(message) {
                return Err(FeedError::DeleteInFlight(message));
            }
            let id = state
                .pending
                .add(PendingOperation::Delete(PendingDelete { message }));
            debug!(local_id = %id, message_id = %message, "Queued delete");
            Ok(id)
        })
    }

    // -----------------------------------------------------------------------
    // Execute (asynchronous)
    // -----------------------------------------------------------------------

    /// Issue the backend call for entry `id` and settle it.
    pub async fn run(&self, id: LocalId) -> Outcome {
        let op = match self.shared.inspect(|state| state.pending.get(id).cloned()) {
            Ok(Some(op)) => op,
            Ok(None) | Err(_) => {
                debug!(local_id = %id, "Nothing to execute");
                return Outcome::Discarded { local_id: id };
            }
        };

        match op {
            PendingOperation::Send(send) => self.run_send(id, send).await,
            PendingOperation::Reaction(reaction) => {
                let result = self
                    .backend
                    .toggle_reaction(
                        reaction.message,
                        &reaction.emoji,
                        &reaction.actor,
                        reaction.action.is_add(),
                    )
                    .await;
                self.settle_transient(id, result)
            }
            PendingOperation::Delete(delete) => {
                let result = self.backend.delete_message(delete.message).await;
                self.settle_transient(id, result)
            }
        }
    }

    async fn run_send(&self, id: LocalId, send: PendingSend) -> Outcome {
        if send.status != SendStatus::InFlight {
            debug!(local_id = %id, "Send already failed, waiting for retry");
            return Outcome::Discarded { local_id: id };
        }

        match self
            .backend
            .create_message(self.conversation, &send.draft)
            .await
        {
            Ok(message) => {
                if self.remove(id) {
                    debug!(local_id = %id, message_id = %message.id, "Send committed");
                    Outcome::Committed {
                        local_id: id,
                        message: Some(message.id),
                    }
                } else {
                    Outcome::Discarded { local_id: id }
                }
            }
            Err(error) => {
                warn!(local_id = %id, error = %error, "Send failed");
                let marked = self
                    .shared
                    .update(|state| Ok(state.pending.mark_failed(id, error.clone())))
                    .unwrap_or(false);
                if marked {
                    Outcome::Failed {
                        local_id: id,
                        error,
                    }
                } else {
                    Outcome::Discarded { local_id: id }
                }
            }
        }
    }

    /// Reactions and deletes leave the table on both success and failure.
    /// Removing a failed entry is the rollback: the feed was never touched.
    fn settle_transient(&self, id: LocalId, result: std::result::Result<(), MutationError>) -> Outcome {
        let removed = self.remove(id);
        match result {
            _ if !removed => Outcome::Discarded { local_id: id },
            Ok(()) => {
                debug!(local_id = %id, "Operation committed");
                Outcome::Committed {
                    local_id: id,
                    message: None,
                }
            }
            Err(error) => {
                warn!(local_id = %id, error = %error, "Operation rolled back");
                Outcome::RolledBack {
                    local_id: id,
                    error,
                }
            }
        }
    }

    fn remove(&self, id: LocalId) -> bool {
        self.shared
            .update(|state| Ok(state.pending.remove(id).is_some()))
            .unwrap_or(false)
    }
}
