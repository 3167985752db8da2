//! Holds the last fetched authoritative page(s) for one conversation.
//!
//! The held list is only ever replaced wholesale by a completed fetch.
//! There is no way to patch an individual message from outside.

use std::collections::HashSet;

use tracing::debug;

use threadline_shared::{Message, MessageId};

/// Ticket issued when a fetch starts. Responses carrying an older ticket
/// than the last applied one are stale and get dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
pub struct FeedStore {
    messages: Vec<Message>,
    pages_loaded: u32,
    has_more: bool,
    next_ticket: u64,
    applied_ticket: Option<FetchTicket>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held messages.
    pub fn set_page(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn get(&self) -> &[Message] {
        &self.messages
    }

    pub fn find(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn pages_loaded(&self) -> u32 {
        self.pages_loaded
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn issue_ticket(&mut self) -> FetchTicket {
        self.next_ticket += 1;
        FetchTicket(self.next_ticket)
    }

    /// Apply a completed fetch unless a newer one has already landed.
    ///
    /// If older pages were loaded while the fetch was in flight, the held
    /// messages preceding the fetched window are kept in front of it.
    ///
    /// Returns `false` when the result was stale and discarded.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        messages: Vec<Message>,
        pages_loaded: u32,
        has_more: bool,
    ) -> bool {
        if self.applied_ticket.is_some_and(|applied| ticket < applied) {
            debug!(?ticket, applied = ?self.applied_ticket, "Dropping stale feed fetch");
            return false;
        }

        self.applied_ticket = Some(ticket);
        if pages_loaded < self.pages_loaded {
            let fetched: HashSet<MessageId> = messages.iter().map(|m| m.id).collect();
            let older = self
                .messages
                .iter()
                .take_while(|m| !fetched.contains(&m.id))
                .cloned();
            let combined = dedup_by_id(older.chain(messages));
            self.set_page(combined);
        } else {
            self.pages_loaded = pages_loaded;
            self.has_more = has_more;
            self.set_page(messages);
        }
        true
    }

    /// Prepend an older page onto whatever is held now.
    ///
    /// This only ever adds history, so it is applied regardless of fetches
    /// that landed in the meantime. `has_more` is only taken from the page
    /// if it is the deepest one loaded so far.
    pub fn apply_older(&mut self, page: u32, older: Vec<Message>, has_more: bool) {
        let combined = self.prepend_older(older);
        self.set_page(combined);
        if page + 1 >= self.pages_loaded {
            self.pages_loaded = page + 1;
            self.has_more = has_more;
        }
    }

    /// Older messages followed by the currently held ones, first occurrence
    /// of each id wins.
    pub fn prepend_older(&self, older: Vec<Message>) -> Vec<Message> {
        dedup_by_id(older.into_iter().chain(self.messages.iter().cloned()))
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pages_loaded = 0;
        self.has_more = false;
    }
}

/// Flatten fetched pages (page `0` first, i.e. newest first) into one
/// chronological list.
pub fn assemble_pages(pages: Vec<Vec<Message>>) -> Vec<Message> {
    dedup_by_id(pages.into_iter().rev().flatten())
}

fn dedup_by_id(messages: impl Iterator<Item = Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages.filter(|m| seen.insert(m.id)).collect()
}

#[cfg(test)]
mod tests {
    use threadline_shared::ActorId;

    use super::*;

    fn msg(body: &str) -> Message {
        Message::text(MessageId::new(), ActorId::new("alice"), body)
    }

    #[test]
    fn test_set_page_replaces_wholesale() {
        let mut store = FeedStore::new();
        store.set_page(vec![msg("one"), msg("two")]);
        store.set_page(vec![msg("three")]);

        assert_eq!(store.get().len(), 1);
        assert_eq!(store.get()[0].content, "three");
    }

    #[test]
    fn test_stale_fetch_is_dropped() {
        let mut store = FeedStore::new();
        let first = store.issue_ticket();
        let second = store.issue_ticket();

        assert!(store.apply_fetch(second, vec![msg("fresh")], 1, false));
        assert!(!store.apply_fetch(first, vec![msg("stale")], 1, true));

        assert_eq!(store.get()[0].content, "fresh");
        assert!(!store.has_more());
    }

    #[test]
    fn test_prepend_older_dedupes_by_id() {
        let mut store = FeedStore::new();
        let shared = msg("boundary");
        store.set_page(vec![shared.clone(), msg("newest")]);

        let combined = store.prepend_older(vec![msg("oldest"), shared.clone()]);
        let bodies: Vec<&str> = combined.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(bodies, vec!["oldest", "boundary", "newest"]);
    }

    #[test]
    fn test_older_page_survives_newer_fetch() {
        let mut store = FeedStore::new();
        let newest = msg("newest");
        let ticket = store.issue_ticket();
        store.apply_fetch(ticket, vec![newest.clone()], 1, true);

        // A refresh issued before the older page arrives lands after it.
        let refresh = store.issue_ticket();
        store.apply_older(1, vec![msg("oldest")], false);
        assert_eq!(store.pages_loaded(), 2);
        assert!(!store.has_more());

        assert!(store.apply_fetch(refresh, vec![newest, msg("latest")], 1, true));
        let bodies: Vec<&str> = store.get().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(bodies, vec!["oldest", "newest", "latest"]);
        assert_eq!(store.pages_loaded(), 2);
        assert!(!store.has_more());
    }

    #[test]
    fn test_shallower_older_page_keeps_has_more() {
        let mut store = FeedStore::new();
        let ticket = store.issue_ticket();
        store.apply_fetch(ticket, vec![msg("a"), msg("b")], 3, false);

        store.apply_older(1, vec![msg("z")], true);
        assert_eq!(store.pages_loaded(), 3);
        assert!(!store.has_more());
        assert_eq!(store.get()[0].content, "z");
    }

    #[test]
    fn test_assemble_pages_orders_oldest_first() {
        let overlap = msg("c");
        let newest = vec![overlap.clone(), msg("d")];
        let older = vec![msg("a"), msg("b"), overlap];

        let combined = assemble_pages(vec![newest, older]);
        let bodies: Vec<&str> = combined.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(bodies, vec!["a", "b", "c", "d"]);
    }
}
