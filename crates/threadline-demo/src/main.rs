//! # threadline-demo
//!
//! Opens a conversation against the in-memory backend and walks through the
//! optimistic flows: a send that commits, a reaction that fails and rolls
//! back, a send that fails and is retried, and a delete. Every view pushed
//! to the render sink is printed as JSON.

use std::sync::Arc;

use futures::future::join_all;
use tracing::info;
use tracing_subscriber::EnvFilter;

use threadline_feed::{
    CallKind, ChannelSink, Conversation, FeedConfig, MemoryBackend, Outcome, ReactionAction,
};
use threadline_shared::{ActorId, ConversationId, Draft, Message, MessageId, MutationError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,threadline_feed=debug")),
        )
        .init();

    info!("Starting threadline demo v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = FeedConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Seed the backend and open the conversation
    // -----------------------------------------------------------------------
    let alice = ActorId::new("alice");
    let bob = ActorId::new("bob");
    let conversation_id = ConversationId::new();

    let backend = Arc::new(MemoryBackend::new());
    backend.seed(
        conversation_id,
        vec![
            Message::text(MessageId::new(), alice.clone(), "Kickoff notes are up"),
            Message::text(MessageId::new(), bob, "Thanks, reading now"),
        ],
    );

    let conversation = Conversation::open(
        conversation_id,
        alice.clone(),
        backend.clone(),
        config.clone(),
    );

    let (sink, mut views) = ChannelSink::new(config.sink_buffer);
    let printer = tokio::spawn(async move {
        let mut n = 0usize;
        while let Some(view) = views.recv().await {
            n += 1;
            match serde_json::to_string(&*view) {
                Ok(json) => println!("view #{n}: {json}"),
                Err(e) => tracing::error!(error = %e, "Failed to encode view"),
            }
        }
    });
    conversation.subscribe(Arc::new(sink))?;
    conversation.refresh().await?;

    let first = conversation
        .view()?
        .first()
        .and_then(|m| m.server_id())
        .ok_or_else(|| anyhow::anyhow!("feed is empty"))?;

    // -----------------------------------------------------------------------
    // 4. Concurrent send + reaction, the reaction fails
    // -----------------------------------------------------------------------
    backend.fail_next(
        CallKind::Reaction,
        MutationError::transport("connection reset"),
    );
    let send = conversation.spawn_send(Draft::new(alice.clone(), "Looks good to me"))?;
    let react = conversation.spawn_react(first, "👍", ReactionAction::Add)?;
    for outcome in join_all([send.handle, react.handle]).await {
        report(outcome?);
    }

    // -----------------------------------------------------------------------
    // 5. A failed send, then a retry
    // -----------------------------------------------------------------------
    backend.fail_next(CallKind::Create, MutationError::transport("timeout"));
    let failed = conversation
        .send(Draft::new(alice.clone(), "Shipping Friday").quoting(first))
        .await?;
    report(failed.clone());
    if let Outcome::Failed { local_id, .. } = failed {
        report(conversation.retry(local_id).await?);
    }

    // -----------------------------------------------------------------------
    // 6. Delete, then close
    // -----------------------------------------------------------------------
    report(conversation.delete(first).await?);
    if let Some(shown) = conversation.view()?.first() {
        info!(text = shown.display_text(), "First message after delete");
    }

    // Closing drops the sink, which ends the printer task.
    conversation.close();
    printer.await?;

    info!("Demo finished");
    Ok(())
}

fn report(outcome: Outcome) {
    match &outcome {
        Outcome::Committed { local_id, message } => {
            info!(%local_id, ?message, "Committed");
        }
        Outcome::Failed { local_id, error } => {
            info!(%local_id, %error, "Send failed, kept for retry");
        }
        Outcome::RolledBack { local_id, error } => {
            info!(%local_id, %error, "Rolled back");
        }
        Outcome::Discarded { local_id } => {
            info!(%local_id, "Result discarded");
        }
    }
}
