//! Overlay of the pending table onto the authoritative feed.
//!
//! [`reconcile`] is a pure function of its two snapshots: identical inputs
//! always yield an identical view. Nothing here touches the network or
//! mutates either input.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use threadline_shared::constants::DELETED_PLACEHOLDER;
use threadline_shared::{
    ActorId, Attachment, LocalId, Message, MessageId, MutationError, Reaction,
};

use crate::pending::{PendingEntry, PendingOperation, PendingSend, ReactionAction, SendStatus};

/// Where a rendered entry comes from. The two namespaces are disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "source", content = "id", rename_all = "snake_case")]
pub enum RenderKey {
    Server(MessageId),
    Local(LocalId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderStatus {
    Normal,
    Sending,
    Failed { error: MutationError, retryable: bool },
}

/// One entry of the materialized view handed to render sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderableMessage {
    pub key: RenderKey,
    pub author: ActorId,
    /// `None` once the message is deleted; the original text is never exposed.
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    pub reactions: Vec<Reaction>,
    pub quoted: Option<MessageId>,
    pub mentions: Vec<ActorId>,
    pub deleted: bool,
    pub status: RenderStatus,
}

impl RenderableMessage {
    fn from_message(message: &Message) -> Self {
        let mut rendered = Self {
            key: RenderKey::Server(message.id),
            author: message.author.clone(),
            content: Some(message.content.clone()),
            created_at: message.created_at,
            attachments: message.attachments.clone(),
            reactions: message.reactions.clone(),
            quoted: message.quoted,
            mentions: message.mentions.clone(),
            deleted: false,
            status: RenderStatus::Normal,
        };
        if message.deleted {
            rendered.mark_deleted();
        }
        rendered
    }

    fn from_pending_send(id: LocalId, send: &PendingSend) -> Self {
        let status = match &send.status {
            SendStatus::InFlight => RenderStatus::Sending,
            SendStatus::Failed { error } => RenderStatus::Failed {
                error: error.clone(),
                retryable: error.is_retryable(),
            },
        };
        Self {
            key: RenderKey::Local(id),
            author: send.draft.author.clone(),
            content: Some(send.draft.content.clone()),
            created_at: send.submitted_at,
            attachments: send.draft.attachments.clone(),
            reactions: Vec::new(),
            quoted: send.draft.quoted,
            mentions: send.draft.mentions.clone(),
            deleted: false,
            status,
        }
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
        self.content = None;
        self.attachments.clear();
    }

    pub fn server_id(&self) -> Option<MessageId> {
        match self.key {
            RenderKey::Server(id) => Some(id),
            RenderKey::Local(_) => None,
        }
    }

    pub fn local_id(&self) -> Option<LocalId> {
        match self.key {
            RenderKey::Local(id) => Some(id),
            RenderKey::Server(_) => None,
        }
    }

    pub fn reaction(&self, emoji: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.emoji == emoji)
    }

    /// Text to show for this entry; deleted messages get a placeholder.
    pub fn display_text(&self) -> &str {
        self.content.as_deref().unwrap_or(DELETED_PLACEHOLDER)
    }
}

/// Produce the view for one render pass.
///
/// Base messages keep their server order. Reaction toggles and deletes are
/// applied to copies in pending-table order; operations whose target is not
/// in `feed` are skipped. Uncommitted sends are appended after every base
/// message, also in table order.
pub fn reconcile(feed: &[Message], pending: &[PendingEntry]) -> Vec<RenderableMessage> {
    let mut view: Vec<RenderableMessage> =
        feed.iter().map(RenderableMessage::from_message).collect();

    let mut index: HashMap<MessageId, usize> = HashMap::with_capacity(view.len());
    for (pos, message) in feed.iter().enumerate() {
        index.entry(message.id).or_insert(pos);
    }

    let mut sends = Vec::new();
    for entry in pending {
        match &entry.op {
            PendingOperation::Reaction(op) => {
                let Some(&pos) = index.get(&op.message) else {
                    continue;
                };
                let reactions = &mut view[pos].reactions;
                match op.action {
                    ReactionAction::Add => Reaction::add_actor(reactions, &op.emoji, &op.actor),
                    ReactionAction::Remove => {
                        Reaction::remove_actor(reactions, &op.emoji, &op.actor)
                    }
                }
            }
            PendingOperation::Delete(op) => {
                if let Some(&pos) = index.get(&op.message) {
                    view[pos].mark_deleted();
                }
            }
            PendingOperation::Send(send) => {
                sends.push(RenderableMessage::from_pending_send(entry.id, send));
            }
        }
    }

    view.extend(sends);
    view
}
