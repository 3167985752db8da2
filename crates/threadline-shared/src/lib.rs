//! Types shared by every threadline crate: identifiers, the authoritative
//! message model, drafts, and the typed error returned by mutation calls.

pub mod constants;
pub mod error;
pub mod models;
pub mod types;

pub use error::{MutationError, MutationErrorKind};
pub use models::{Attachment, Draft, Message, Reaction};
pub use types::{ActorId, AttachmentId, ConversationId, LocalId, MessageId};
