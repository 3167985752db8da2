//! One open conversation: its feed store, pending table, sinks, and the
//! executor and retry coordinator acting on them.
//!
//! The handle is cheap to clone. Clones share the same state, so a UI can
//! keep one while spawned tasks hold others.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use threadline_shared::{ActorId, ConversationId, Draft, LocalId, MessageId};

use crate::backend::FeedBackend;
use crate::config::FeedConfig;
use crate::error::Result;
use crate::executor::{OperationExecutor, Outcome};
use crate::feed_store::assemble_pages;
use crate::pending::ReactionAction;
use crate::reconciler::RenderableMessage;
use crate::retry::RetryCoordinator;
use crate::sink::RenderSink;
use crate::state::Shared;

/// An operation that was queued and is now executing on the runtime.
pub struct Submitted {
    pub local_id: LocalId,
    pub handle: JoinHandle<Outcome>,
}

#[derive(Clone)]
pub struct Conversation {
    id: ConversationId,
    actor: ActorId,
    config: FeedConfig,
    backend: Arc<dyn FeedBackend>,
    shared: Arc<Shared>,
    executor: OperationExecutor,
    retry: RetryCoordinator,
}

impl Conversation {
    /// Open a conversation for `actor`. Nothing is fetched until
    /// [`Conversation::refresh`] or [`Conversation::load_more`] is called.
    pub fn open(
        id: ConversationId,
        actor: ActorId,
        backend: Arc<dyn FeedBackend>,
        config: FeedConfig,
    ) -> Self {
        let shared = Arc::new(Shared::new(config.pending_warn_threshold));
        let executor = OperationExecutor::new(id, shared.clone(), backend.clone());
        let retry = RetryCoordinator::new(executor.clone());
        info!(conversation = %id, actor = %actor, "Opened conversation");
        Self {
            id,
            actor,
            config,
            backend,
            shared,
            executor,
            retry,
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Register a sink. It immediately receives the current view.
    pub fn subscribe(&self, sink: Arc<dyn RenderSink>) -> Result<()> {
        self.shared.subscribe(sink)
    }

    /// The current reconciled view.
    pub fn view(&self) -> Result<Vec<RenderableMessage>> {
        self.shared.inspect(|state| state.view())
    }

    pub fn pending_len(&self) -> Result<usize> {
        self.shared.inspect(|state| state.pending.len())
    }

    pub fn has_more(&self) -> Result<bool> {
        self.shared.inspect(|state| state.feed.has_more())
    }

    // -----------------------------------------------------------------------
    // Feed fetches
    // -----------------------------------------------------------------------

    /// Re-fetch every loaded page (at least one) and replace the feed.
    pub async fn refresh(&self) -> Result<()> {
        let (ticket, pages) = self
            .shared
            .inspect(|state| (state.feed.issue_ticket(), state.feed.pages_loaded().max(1)))?;

        let mut windows = Vec::with_capacity(pages as usize);
        let mut has_more = false;
        for page in 0..pages {
            let fetched = self
                .backend
                .fetch_page(self.id, page, self.config.page_size)
                .await
                .map_err(|e| {
                    warn!(conversation = %self.id, page, error = %e, "Feed refresh failed");
                    e
                })?;
            has_more = fetched.has_more;
            windows.push(fetched.messages);
            if !has_more {
                break;
            }
        }

        let loaded = windows.len() as u32;
        let messages = assemble_pages(windows);
        self.shared.update(|state| {
            if state.feed.apply_fetch(ticket, messages, loaded, has_more) {
                debug!(conversation = %self.id, pages = loaded, "Feed refreshed");
            }
            Ok(())
        })
    }

    /// Fetch the next older page and prepend it. Returns whether even older
    /// history remains.
    pub async fn load_more(&self) -> Result<bool> {
        let page = self.shared.inspect(|state| state.feed.pages_loaded())?;

        let fetched = self
            .backend
            .fetch_page(self.id, page, self.config.page_size)
            .await
            .map_err(|e| {
                warn!(conversation = %self.id, page, error = %e, "Loading older page failed");
                e
            })?;

        self.shared.update(|state| {
            state
                .feed
                .apply_older(page, fetched.messages, fetched.has_more);
            debug!(conversation = %self.id, page, "Older page loaded");
            Ok(state.feed.has_more())
        })
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    pub async fn send(&self, draft: Draft) -> Result<Outcome> {
        let id = self.executor.enqueue_send(draft)?;
        Ok(self.finish(id).await)
    }

    pub async fn react(
        &self,
        message: MessageId,
        emoji: &str,
        action: ReactionAction,
    ) -> Result<Outcome> {
        let id = self
            .executor
            .enqueue_reaction(message, emoji, &self.actor, action)?;
        Ok(self.finish(id).await)
    }

    /// Add the acting member's `emoji` if absent from the feed, remove it
    /// otherwise.
    pub async fn toggle_reaction(&self, message: MessageId, emoji: &str) -> Result<Outcome> {
        let id = self.executor.enqueue_toggle(message, emoji, &self.actor)?;
        Ok(self.finish(id).await)
    }

    pub async fn delete(&self, message: MessageId) -> Result<Outcome> {
        let id = self.executor.enqueue_delete(message)?;
        Ok(self.finish(id).await)
    }

    pub async fn retry(&self, failed: LocalId) -> Result<Outcome> {
        let id = self.retry.requeue(failed)?;
        Ok(self.finish(id).await)
    }

    pub fn discard(&self, failed: LocalId) -> Result<()> {
        self.retry.discard(failed)
    }

    // -----------------------------------------------------------------------
    // Spawned variants: queue now, execute on the runtime
    // -----------------------------------------------------------------------

    pub fn spawn_send(&self, draft: Draft) -> Result<Submitted> {
        let id = self.executor.enqueue_send(draft)?;
        Ok(self.spawn(id))
    }

    pub fn spawn_react(
        &self,
        message: MessageId,
        emoji: &str,
        action: ReactionAction,
    ) -> Result<Submitted> {
        let id = self
            .executor
            .enqueue_reaction(message, emoji, &self.actor, action)?;
        Ok(self.spawn(id))
    }

    pub fn spawn_toggle_reaction(&self, message: MessageId, emoji: &str) -> Result<Submitted> {
        let id = self.executor.enqueue_toggle(message, emoji, &self.actor)?;
        Ok(self.spawn(id))
    }

    pub fn spawn_delete(&self, message: MessageId) -> Result<Submitted> {
        let id = self.executor.enqueue_delete(message)?;
        Ok(self.spawn(id))
    }

    pub fn spawn_retry(&self, failed: LocalId) -> Result<Submitted> {
        let id = self.retry.requeue(failed)?;
        Ok(self.spawn(id))
    }

    /// Tear down the tables. Calls already in flight still complete, but
    /// their results are dropped and nothing is rendered.
    pub fn close(&self) {
        self.shared.close();
        info!(conversation = %self.id, "Closed conversation");
    }

    fn spawn(&self, id: LocalId) -> Submitted {
        let this = self.clone();
        let handle = tokio::spawn(async move { this.finish(id).await });
        Submitted {
            local_id: id,
            handle,
        }
    }

    async fn finish(&self, id: LocalId) -> Outcome {
        let outcome = self.executor.run(id).await;
        if outcome.is_committed() && self.config.refresh_after_commit {
            if let Err(e) = self.refresh().await {
                warn!(conversation = %self.id, error = %e, "Refresh after commit failed");
            }
        }
        outcome
    }
}
