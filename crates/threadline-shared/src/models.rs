//! Domain models exchanged with the feed backend.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! straight to a UI layer or a REST client.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActorId, AttachmentId, MessageId};

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// Reference to a file attached to a message or draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub id: AttachmentId,
    pub file_name: String,
    /// Size in bytes.
    pub file_size: u64,
}

// ---------------------------------------------------------------------------
// Reaction
// ---------------------------------------------------------------------------

/// An emoji together with the distinct actors who applied it.
///
/// A reaction whose actor set is empty must not exist; callers remove it
/// instead (see [`Reaction::remove_actor`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: String,
    pub actors: BTreeSet<ActorId>,
}

impl Reaction {
    pub fn new(emoji: impl Into<String>, actor: ActorId) -> Self {
        Self {
            emoji: emoji.into(),
            actors: BTreeSet::from([actor]),
        }
    }

    pub fn count(&self) -> usize {
        self.actors.len()
    }

    pub fn contains(&self, actor: &ActorId) -> bool {
        self.actors.contains(actor)
    }

    /// Insert `actor` into the emoji's set, creating the reaction if absent.
    /// Set membership makes repeated adds a no-op.
    pub fn add_actor(reactions: &mut Vec<Reaction>, emoji: &str, actor: &ActorId) {
        match reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(reaction) => {
                reaction.actors.insert(actor.clone());
            }
            None => reactions.push(Reaction::new(emoji, actor.clone())),
        }
    }

    /// Remove `actor` from the emoji's set, dropping the reaction once empty.
    pub fn remove_actor(reactions: &mut Vec<Reaction>, emoji: &str, actor: &ActorId) {
        if let Some(idx) = reactions.iter().position(|r| r.emoji == emoji) {
            reactions[idx].actors.remove(actor);
            if reactions[idx].actors.is_empty() {
                reactions.remove(idx);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// An authoritative message as returned by the backend.
///
/// Never mutated in place by the client; a fresh fetch replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author: ActorId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    pub reactions: Vec<Reaction>,
    /// The message this one quotes, if any.
    pub quoted: Option<MessageId>,
    pub mentions: Vec<ActorId>,
    /// Soft-delete flag set by the server.
    pub deleted: bool,
}

impl Message {
    /// Build a plain text message with no reactions or attachments.
    pub fn text(id: MessageId, author: ActorId, content: impl Into<String>) -> Self {
        Self {
            id,
            author,
            content: content.into(),
            created_at: Utc::now(),
            attachments: Vec::new(),
            reactions: Vec::new(),
            quoted: None,
            mentions: Vec::new(),
            deleted: false,
        }
    }

    pub fn reaction(&self, emoji: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.emoji == emoji)
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// Content the user submitted but the server has not yet accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Draft {
    pub author: ActorId,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub quoted: Option<MessageId>,
    pub mentions: Vec<ActorId>,
}

impl Draft {
    pub fn new(author: ActorId, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
            attachments: Vec::new(),
            quoted: None,
            mentions: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn quoting(mut self, message: MessageId) -> Self {
        self.quoted = Some(message);
        self
    }

    pub fn mentioning(mut self, actor: ActorId) -> Self {
        self.mentions.push(actor);
        self
    }
}
