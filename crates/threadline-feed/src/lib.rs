//! # threadline-feed
//!
//! Keeps a user's view of one conversation feed consistent while optimistic
//! mutations (send, reaction toggle, delete, retry) are in flight against a
//! feed that is refreshed from a paginated backend.
//!
//! - [`FeedStore`] holds the last fetched authoritative page(s)
//! - [`PendingTable`] holds in-flight and failed optimistic operations
//! - [`reconcile`] overlays the second onto the first, purely
//! - [`OperationExecutor`] runs one backend call and settles its entry
//! - [`RetryCoordinator`] re-submits or discards failed sends
//!
//! [`Conversation`] wires them together and pushes every new view to the
//! registered [`RenderSink`]s.

pub mod backend;
pub mod config;
pub mod conversation;
pub mod executor;
pub mod feed_store;
pub mod memory;
pub mod pending;
pub mod reconciler;
pub mod retry;
pub mod sink;

mod error;
mod state;

pub use backend::{FeedBackend, FeedPage};
pub use config::FeedConfig;
pub use conversation::{Conversation, Submitted};
pub use error::{FeedError, Result};
pub use executor::{OperationExecutor, Outcome};
pub use feed_store::FeedStore;
pub use memory::{CallKind, MemoryBackend};
pub use pending::{
    PendingDelete, PendingEntry, PendingOperation, PendingReaction, PendingSend, PendingTable,
    ReactionAction, SendStatus,
};
pub use reconciler::{reconcile, RenderKey, RenderStatus, RenderableMessage};
pub use retry::RetryCoordinator;
pub use sink::{ChannelSink, RenderSink};
