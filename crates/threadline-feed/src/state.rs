//! Per-conversation state shared by the executor, the retry coordinator
//! and the conversation handle.
//!
//! Every access goes through one lock, and the view is reconciled and
//! pushed to sinks before the lock is released, so a render pass never sees
//! a half-applied change and sinks receive views in order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{FeedError, Result};
use crate::feed_store::FeedStore;
use crate::pending::PendingTable;
use crate::reconciler::{reconcile, RenderableMessage};
use crate::sink::RenderSink;

pub(crate) struct ConversationState {
    pub feed: FeedStore,
    pub pending: PendingTable,
    sinks: Vec<Arc<dyn RenderSink>>,
}

impl ConversationState {
    pub fn view(&self) -> Vec<RenderableMessage> {
        reconcile(self.feed.get(), self.pending.list())
    }
}

pub(crate) struct Shared {
    state: Mutex<ConversationState>,
    cancel: CancellationToken,
}

impl Shared {
    pub fn new(pending_warn_threshold: usize) -> Self {
        Self {
            state: Mutex::new(ConversationState {
                feed: FeedStore::new(),
                pending: PendingTable::new(pending_warn_threshold),
                sinks: Vec::new(),
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // State is consistent between statements, so a poisoned lock is safe
    // to keep using.
    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the state without publishing a new view.
    pub fn inspect<R>(&self, f: impl FnOnce(&mut ConversationState) -> R) -> Result<R> {
        let mut state = self.lock();
        if self.is_closed() {
            return Err(FeedError::ConversationClosed);
        }
        Ok(f(&mut state))
    }

    /// Run `f` and, if it succeeds, reconcile and push the new view.
    pub fn update<R>(&self, f: impl FnOnce(&mut ConversationState) -> Result<R>) -> Result<R> {
        let mut state = self.lock();
        if self.is_closed() {
            return Err(FeedError::ConversationClosed);
        }
        let result = f(&mut state)?;
        publish(&state);
        Ok(result)
    }

    pub fn subscribe(&self, sink: Arc<dyn RenderSink>) -> Result<()> {
        let mut state = self.lock();
        if self.is_closed() {
            return Err(FeedError::ConversationClosed);
        }
        sink.render(&state.view());
        state.sinks.push(sink);
        Ok(())
    }

    /// Tear the tables down. Later results from in-flight calls find the
    /// token cancelled and are dropped without rendering.
    pub fn close(&self) {
        let mut state = self.lock();
        self.cancel.cancel();
        state.feed.clear();
        state.pending.clear();
        state.sinks.clear();
    }
}

fn publish(state: &ConversationState) {
    if state.sinks.is_empty() {
        return;
    }
    let view = state.view();
    debug!(
        items = view.len(),
        pending = state.pending.len(),
        sinks = state.sinks.len(),
        "Publishing view"
    );
    for sink in &state.sinks {
        sink.render(&view);
    }
}
