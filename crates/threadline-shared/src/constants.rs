/// Default number of messages requested per feed page.
pub const DEFAULT_PAGE_SIZE: u16 = 50;

/// Hard cap on the page size sent to the backend.
pub const MAX_PAGE_SIZE: u16 = 100;

/// Pending table length at which a stuck-operation warning is logged.
pub const DEFAULT_PENDING_WARN_THRESHOLD: usize = 256;

/// Default capacity of a channel-backed render sink.
pub const DEFAULT_SINK_BUFFER: usize = 64;

/// Text a renderer may show in place of a soft-deleted message's content.
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";
