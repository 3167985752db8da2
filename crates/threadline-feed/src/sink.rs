//! Rendering sinks that receive a fresh materialized view on every change.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::reconciler::RenderableMessage;

/// Receives the full reconciled view after each state change.
///
/// Called while the conversation state is locked so views arrive in order.
/// Implementations must return quickly and must not call back into the
/// conversation.
pub trait RenderSink: Send + Sync {
    fn render(&self, view: &[RenderableMessage]);
}

/// Forwards views over a bounded channel to an async consumer.
///
/// When the consumer falls behind the view is dropped; the next state
/// change carries the complete view again.
pub struct ChannelSink {
    tx: mpsc::Sender<Arc<Vec<RenderableMessage>>>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<Vec<RenderableMessage>>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl RenderSink for ChannelSink {
    fn render(&self, view: &[RenderableMessage]) {
        if let Err(e) = self.tx.try_send(Arc::new(view.to_vec())) {
            tracing::debug!(error = %e, "Render sink full or closed, dropping view");
        }
    }
}
