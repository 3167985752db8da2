//! In-memory [`FeedBackend`] with scripted failures and call gating.
//!
//! Used by the demo binary and by tests that need to hold calls in flight
//! and resolve them in a chosen order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{oneshot, Notify};
use tracing::debug;

use threadline_shared::{
    ActorId, ConversationId, Draft, Message, MessageId, MutationError, Reaction,
};

use crate::backend::{FeedBackend, FeedPage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Fetch,
    Create,
    Reaction,
    Delete,
}

#[derive(Default)]
struct Inner {
    feeds: HashMap<ConversationId, Vec<Message>>,
    failures: HashMap<CallKind, VecDeque<MutationError>>,
    paused: HashSet<CallKind>,
    held: Vec<(CallKind, oneshot::Sender<()>)>,
}

#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    held_changed: Notify,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace a conversation's server-side history (chronological).
    pub fn seed(&self, conversation: ConversationId, messages: Vec<Message>) {
        self.lock().feeds.insert(conversation, messages);
    }

    pub fn messages(&self, conversation: ConversationId) -> Vec<Message> {
        self.lock()
            .feeds
            .get(&conversation)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the next call of `kind` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, kind: CallKind, error: MutationError) {
        self.lock().failures.entry(kind).or_default().push_back(error);
    }

    /// Hold every subsequent call of `kind` until released.
    pub fn pause(&self, kind: CallKind) {
        self.lock().paused.insert(kind);
    }

    /// Stop holding `kind` and release every held call of that kind.
    pub fn resume(&self, kind: CallKind) {
        let mut inner = self.lock();
        inner.paused.remove(&kind);
        let (release, keep): (Vec<_>, Vec<_>) = inner.held.drain(..).partition(|(k, _)| *k == kind);
        inner.held = keep;
        drop(inner);
        for (_, tx) in release {
            let _ = tx.send(());
        }
    }

    pub fn held(&self) -> usize {
        self.lock().held.len()
    }

    /// Wait until at least `count` calls are being held.
    pub async fn wait_for_held(&self, count: usize) {
        loop {
            let notified = self.held_changed.notified();
            if self.held() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Release the oldest held call.
    pub fn release_first(&self) -> bool {
        let mut inner = self.lock();
        if inner.held.is_empty() {
            return false;
        }
        let (_, tx) = inner.held.remove(0);
        drop(inner);
        tx.send(()).is_ok()
    }

    /// Release the most recently held call.
    pub fn release_last(&self) -> bool {
        let held = self.lock().held.pop();
        match held {
            Some((_, tx)) => tx.send(()).is_ok(),
            None => false,
        }
    }

    async fn gate(&self, kind: CallKind) -> Result<(), MutationError> {
        let rx = {
            let mut inner = self.lock();
            if inner.paused.contains(&kind) {
                let (tx, rx) = oneshot::channel();
                inner.held.push((kind, tx));
                Some(rx)
            } else {
                None
            }
        };
        if let Some(rx) = rx {
            debug!(?kind, "Holding backend call");
            self.held_changed.notify_waiters();
            let _ = rx.await;
        }

        match self.lock().failures.get_mut(&kind).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn with_message<R>(
        &self,
        id: MessageId,
        f: impl FnOnce(&mut Message) -> Result<R, MutationError>,
    ) -> Result<R, MutationError> {
        let mut inner = self.lock();
        let message = inner
            .feeds
            .values_mut()
            .flat_map(|messages| messages.iter_mut())
            .find(|m| m.id == id)
            .ok_or_else(|| MutationError::not_found(format!("message {id} does not exist")))?;
        f(message)
    }
}

#[async_trait]
impl FeedBackend for MemoryBackend {
    async fn fetch_page(
        &self,
        conversation: ConversationId,
        page: u32,
        page_size: u16,
    ) -> Result<FeedPage, MutationError> {
        self.gate(CallKind::Fetch).await?;

        let inner = self.lock();
        let all = inner.feeds.get(&conversation).map(Vec::as_slice).unwrap_or(&[]);
        let size = usize::from(page_size.max(1));
        let skip = (page as usize).saturating_mul(size);
        let end = all.len().saturating_sub(skip);
        let start = end.saturating_sub(size);

        Ok(FeedPage {
            messages: all[start..end].to_vec(),
            has_more: start > 0,
        })
    }

    async fn create_message(
        &self,
        conversation: ConversationId,
        draft: &Draft,
    ) -> Result<Message, MutationError> {
        self.gate(CallKind::Create).await?;

        if draft.content.trim().is_empty() && draft.attachments.is_empty() {
            return Err(MutationError::validation("message is empty"));
        }

        let message = Message {
            id: MessageId::new(),
            author: draft.author.clone(),
            content: draft.content.clone(),
            created_at: Utc::now(),
            attachments: draft.attachments.clone(),
            reactions: Vec::new(),
            quoted: draft.quoted,
            mentions: draft.mentions.clone(),
            deleted: false,
        };
        self.lock()
            .feeds
            .entry(conversation)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn toggle_reaction(
        &self,
        message: MessageId,
        emoji: &str,
        actor: &ActorId,
        add: bool,
    ) -> Result<(), MutationError> {
        self.gate(CallKind::Reaction).await?;

        self.with_message(message, |m| {
            if add {
                Reaction::add_actor(&mut m.reactions, emoji, actor);
            } else {
                Reaction::remove_actor(&mut m.reactions, emoji, actor);
            }
            Ok(())
        })
    }

    async fn delete_message(&self, message: MessageId) -> Result<(), MutationError> {
        self.gate(CallKind::Delete).await?;

        self.with_message(message, |m| {
            if m.deleted {
                return Err(MutationError::conflict(format!(
                    "message {} is already deleted",
                    m.id
                )));
            }
            m.deleted = true;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use threadline_shared::MutationErrorKind;

    use super::*;

    fn history(conversation: ConversationId, n: usize) -> MemoryBackend {
        let backend = MemoryBackend::new();
        let messages = (0..n)
            .map(|i| Message::text(MessageId::new(), ActorId::new("alice"), format!("m{i}")))
            .collect();
        backend.seed(conversation, messages);
        backend
    }

    #[tokio::test]
    async fn test_pages_walk_back_from_newest() {
        let conversation = ConversationId::new();
        let backend = history(conversation, 5);

        let newest = backend.fetch_page(conversation, 0, 2).await.unwrap();
        let bodies: Vec<&str> = newest.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(bodies, vec!["m3", "m4"]);
        assert!(newest.has_more);

        let oldest = backend.fetch_page(conversation, 2, 2).await.unwrap();
        assert_eq!(oldest.messages.len(), 1);
        assert_eq!(oldest.messages[0].content, "m0");
        assert!(!oldest.has_more);

        let beyond = backend.fetch_page(conversation, 9, 2).await.unwrap();
        assert!(beyond.messages.is_empty());
    }

    #[tokio::test]
    async fn test_scripted_failure_is_consumed_once() {
        let conversation = ConversationId::new();
        let backend = MemoryBackend::new();
        backend.fail_next(CallKind::Create, MutationError::transport("offline"));

        let draft = Draft::new(ActorId::new("alice"), "hi");
        let err = backend.create_message(conversation, &draft).await.unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::Transport);
        assert!(backend.create_message(conversation, &draft).await.is_ok());
        assert_eq!(backend.messages(conversation).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_draft_is_rejected() {
        let backend = MemoryBackend::new();
        let draft = Draft::new(ActorId::new("alice"), "   ");
        let err = backend
            .create_message(ConversationId::new(), &draft)
            .await
            .unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_double_delete_conflicts() {
        let conversation = ConversationId::new();
        let backend = history(conversation, 1);
        let id = backend.messages(conversation)[0].id;

        backend.delete_message(id).await.unwrap();
        let err = backend.delete_message(id).await.unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::Conflict);
    }
}
