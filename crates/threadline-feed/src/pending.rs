//! Table of optimistic operations that are in flight or failed.
//!
//! Entries keep insertion order, which is the tie-break the reconciler uses
//! when several operations target the same message. Only the executor and
//! the retry coordinator mutate the table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use threadline_shared::{ActorId, Draft, LocalId, MessageId, MutationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    Add,
    Remove,
}

impl ReactionAction {
    pub fn is_add(self) -> bool {
        self == Self::Add
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SendStatus {
    InFlight,
    Failed { error: MutationError },
}

/// A message the user submitted, not yet accepted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSend {
    pub draft: Draft,
    pub status: SendStatus,
    pub submitted_at: DateTime<Utc>,
}

impl PendingSend {
    pub fn new(draft: Draft) -> Self {
        Self {
            draft,
            status: SendStatus::InFlight,
            submitted_at: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SendStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingReaction {
    pub message: MessageId,
    pub emoji: String,
    pub action: ReactionAction,
    pub actor: ActorId,
}

impl PendingReaction {
    /// Whether this entry targets the same (message, emoji, actor) triple.
    pub fn targets(&self, message: MessageId, emoji: &str, actor: &ActorId) -> bool {
        self.message == message && self.emoji == emoji && &self.actor == actor
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingDelete {
    pub message: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingOperation {
    Send(PendingSend),
    Reaction(PendingReaction),
    Delete(PendingDelete),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEntry {
    pub id: LocalId,
    pub op: PendingOperation,
}

#[derive(Debug)]
pub struct PendingTable {
    entries: Vec<PendingEntry>,
    next_id: u64,
    warn_threshold: usize,
    warned: bool,
}

impl PendingTable {
    pub fn new(warn_threshold: usize) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            warn_threshold: warn_threshold.max(1),
            warned: false,
        }
    }

    /// Insert `op` under a freshly assigned local id.
    ///
    /// Ids are never reused within a table, so a late response for a
    /// removed entry cannot resolve against a newer one.
    pub fn add(&mut self, op: PendingOperation) -> LocalId {
        self.next_id += 1;
        let id = LocalId(self.next_id);
        self.entries.push(PendingEntry { id, op });

        if self.entries.len() >= self.warn_threshold && !self.warned {
            self.warned = true;
            warn!(
                pending = self.entries.len(),
                threshold = self.warn_threshold,
                "Pending operation table is large, operations may be stuck"
            );
        }
        id
    }

    pub fn remove(&mut self, id: LocalId) -> Option<PendingOperation> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(idx);
        if self.entries.len() < self.warn_threshold {
            self.warned = false;
        }
        Some(entry.op)
    }

    /// Move a send into the failed state, keeping its draft.
    ///
    /// Returns `false` if `id` is unknown or is not a send.
    pub fn mark_failed(&mut self, id: LocalId, error: MutationError) -> bool {
        match self.get_mut(id) {
            Some(PendingOperation::Send(send)) => {
                send.status = SendStatus::Failed { error };
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: LocalId) -> Option<&PendingOperation> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.op)
    }

    fn get_mut(&mut self, id: LocalId) -> Option<&mut PendingOperation> {
        self.entries.iter_mut().find(|e| e.id == id).map(|e| &mut e.op)
    }

    /// All entries in insertion order.
    pub fn list(&self) -> &[PendingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reaction_in_flight(&self, message: MessageId, emoji: &str, actor: &ActorId) -> bool {
        self.entries.iter().any(|e| match &e.op {
            PendingOperation::Reaction(r) => r.targets(message, emoji, actor),
            _ => false,
        })
    }

    pub fn delete_in_flight(&self, message: MessageId) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(&e.op, PendingOperation::Delete(d) if d.message == message))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.warned = false;
    }
}
