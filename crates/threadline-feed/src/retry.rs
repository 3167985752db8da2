//! User-initiated retry and discard of failed sends.

use tracing::{debug, info};

use threadline_shared::LocalId;

use crate::error::{FeedError, Result};
use crate::executor::{OperationExecutor, Outcome};
use crate::pending::{PendingOperation, PendingSend};

#[derive(Clone)]
pub struct RetryCoordinator {
    executor: OperationExecutor,
}

impl RetryCoordinator {
    pub fn new(executor: OperationExecutor) -> Self {
        Self { executor }
    }

    /// Replace the failed send `failed` with a fresh in-flight one carrying
    /// the same draft (content, attachments, quote, mentions).
    ///
    /// The new entry gets a new local id; the old id is retired so a late
    /// response for the earlier attempt resolves to nothing.
    pub fn requeue(&self, failed: LocalId) -> Result<LocalId> {
        self.executor.shared.update(|state| {
            let draft = match state.pending.get(failed) {
                None => return Err(FeedError::UnknownOperation(failed)),
                Some(PendingOperation::Send(send)) if send.is_failed() => send.draft.clone(),
                Some(_) => return Err(FeedError::NotFailed(failed)),
            };
            state.pending.remove(failed);
            let fresh = state
                .pending
                .add(PendingOperation::Send(PendingSend::new(draft)));
            info!(old = %failed, new = %fresh, "Retrying failed send");
            Ok(fresh)
        })
    }

    pub async fn retry(&self, failed: LocalId) -> Result<Outcome> {
        let fresh = self.requeue(failed)?;
        Ok(self.executor.run(fresh).await)
    }

    /// Drop a failed send without re-submitting it.
    pub fn discard(&self, failed: LocalId) -> Result<()> {
        self.executor.shared.update(|state| {
            match state.pending.get(failed) {
                None => return Err(FeedError::UnknownOperation(failed)),
                Some(PendingOperation::Send(send)) if send.is_failed() => {}
                Some(_) => return Err(FeedError::NotFailed(failed)),
            }
            state.pending.remove(failed);
            debug!(local_id = %failed, "Discarded failed send");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use threadline_shared::{ActorId, ConversationId, Draft, MessageId, MutationError};

    use super::*;
    use crate::memory::{CallKind, MemoryBackend};
    use crate::pending::ReactionAction;
    use crate::state::Shared;

    fn setup() -> (Arc<MemoryBackend>, OperationExecutor, RetryCoordinator) {
        let backend = Arc::new(MemoryBackend::new());
        let executor = OperationExecutor::new(
            ConversationId::new(),
            Arc::new(Shared::new(16)),
            backend.clone(),
        );
        let retry = RetryCoordinator::new(executor.clone());
        (backend, executor, retry)
    }

    #[tokio::test]
    async fn test_retry_commits_under_new_id() {
        let (backend, executor, retry) = setup();
        backend.fail_next(CallKind::Create, MutationError::transport("offline"));

        let first = executor
            .enqueue_send(Draft::new(ActorId::new("alice"), "x"))
            .unwrap();
        assert!(matches!(executor.run(first).await, Outcome::Failed { .. }));

        let outcome = retry.retry(first).await.unwrap();
        assert!(outcome.is_committed());
        assert_ne!(outcome.local_id(), first);
        assert_eq!(
            retry.discard(first).unwrap_err(),
            FeedError::UnknownOperation(first)
        );
    }

    #[tokio::test]
    async fn test_stale_attempt_resolves_to_nothing() {
        let (backend, executor, retry) = setup();
        backend.fail_next(CallKind::Create, MutationError::transport("offline"));
        let first = executor
            .enqueue_send(Draft::new(ActorId::new("alice"), "x"))
            .unwrap();
        executor.run(first).await;

        let fresh = retry.requeue(first).unwrap();
        assert_eq!(
            executor.run(first).await,
            Outcome::Discarded { local_id: first }
        );
        assert!(executor.run(fresh).await.is_committed());
    }

    #[tokio::test]
    async fn test_discard_rejects_reactions() {
        let (_backend, executor, retry) = setup();
        let id = executor
            .enqueue_reaction(
                MessageId::new(),
                "👍",
                &ActorId::new("alice"),
                ReactionAction::Add,
            )
            .unwrap();
        assert_eq!(retry.discard(id).unwrap_err(), FeedError::NotFailed(id));
    }
}
