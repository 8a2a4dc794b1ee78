//! Session transcript: an ordered, append-only message log with a sync
//! cursor.
//!
//! The transcript is owned by exactly one session. Messages are appended in
//! the order the orchestrator produces them and never reordered. The only
//! in-place mutation allowed is growing the assistant message that is still
//! streaming; once finalized it freezes like every other message. The sync
//! cursor counts messages already acknowledged by the remote store and is
//! advanced by the sync agent, never rewound.

use crate::error::{ChatflowError, Result};
use crate::message::{Message, MessageRole};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Ordered message log for one session, plus delivery bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    session_id: String,
    visitor_id: String,
    /// Epoch milliseconds when the conversation started.
    started_at: i64,
    /// Epoch milliseconds of the last transcript mutation.
    last_active: Option<i64>,
    /// Pages the conversation touched, deduplicated, in first-seen order.
    page_urls: Vec<String>,
    messages: Vec<Message>,
    /// Count of messages already acknowledged by the remote store.
    sync_cursor: usize,
    /// True while the newest message is a still-streaming assistant reply.
    /// Not persisted: a transcript loaded from disk is always frozen.
    #[serde(skip)]
    open: bool,
}

impl Transcript {
    /// Creates an empty transcript for the given identity pair.
    pub fn new(session_id: impl Into<String>, visitor_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            visitor_id: visitor_id.into(),
            started_at: Utc::now().timestamp_millis(),
            last_active: None,
            page_urls: Vec::new(),
            messages: Vec::new(),
            sync_cursor: 0,
            open: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// Last mutation time; falls back to the start time before the first
    /// message lands.
    pub fn last_active(&self) -> i64 {
        self.last_active.unwrap_or(self.started_at)
    }

    pub fn page_urls(&self) -> &[String] {
        &self.page_urls
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns an owned copy of the message list.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a finalized message.
    ///
    /// Any still-open assistant message is frozen first, so appends can
    /// never interleave with in-place growth.
    pub fn append(&mut self, role: MessageRole, content: impl Into<String>) {
        self.open = false;
        self.messages.push(Message::now(role, content));
        self.touch();
    }

    /// Appends an empty assistant message that may grow in place via
    /// [`Transcript::update_last`] until [`Transcript::finalize_last`].
    pub fn open_assistant(&mut self) {
        self.messages.push(Message::now(MessageRole::Assistant, ""));
        self.open = true;
        self.touch();
    }

    /// Replaces the content of the still-streaming assistant message.
    ///
    /// Only valid while a message opened by [`Transcript::open_assistant`]
    /// has not been finalized; every other message is immutable.
    pub fn update_last(&mut self, content: impl Into<String>) -> Result<()> {
        if !self.open {
            return Err(ChatflowError::transcript(
                "update_last called with no open assistant message",
            ));
        }
        // open implies non-empty
        let last = self
            .messages
            .last_mut()
            .ok_or_else(|| ChatflowError::internal("open transcript with no messages"))?;
        last.content = content.into();
        self.touch();
        Ok(())
    }

    /// Freezes the streaming assistant message. Idempotent.
    pub fn finalize_last(&mut self) {
        self.open = false;
    }

    /// True while the newest message is still streaming.
    pub fn has_open_message(&self) -> bool {
        self.open
    }

    /// Count of messages already acknowledged by the remote store.
    pub fn cursor(&self) -> usize {
        self.sync_cursor
    }

    /// Advances the sync cursor to `n`, clamped to the transcript length.
    /// The cursor is monotone: a smaller `n` is ignored.
    pub fn advance_cursor(&mut self, n: usize) {
        let n = n.min(self.messages.len());
        if n > self.sync_cursor {
            self.sync_cursor = n;
        }
    }

    /// Messages not yet acknowledged by the remote store.
    pub fn unsynced(&self) -> &[Message] {
        &self.messages[self.sync_cursor..]
    }

    /// True once every message has been acknowledged.
    pub fn fully_synced(&self) -> bool {
        self.sync_cursor == self.messages.len()
    }

    /// Records the page the conversation is happening on, once.
    pub fn record_page_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !self.page_urls.contains(&url) {
            self.page_urls.push(url);
        }
    }

    /// Stamps the transcript as active now.
    pub fn touch(&mut self) {
        self.last_active = Some(Utc::now().timestamp_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Transcript {
        Transcript::new("sid-1", "vid-1")
    }

    #[test]
    fn test_append_preserves_order() {
        let mut t = transcript();
        t.append(MessageRole::User, "first");
        t.append(MessageRole::Assistant, "second");
        t.append(MessageRole::User, "third");

        let contents: Vec<_> = t.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_update_last_requires_open_message() {
        let mut t = transcript();
        t.append(MessageRole::User, "hi");
        assert!(t.update_last("mutated").is_err());

        t.open_assistant();
        t.update_last("partial").unwrap();
        t.update_last("partial answer").unwrap();
        assert_eq!(t.messages().last().unwrap().content, "partial answer");

        t.finalize_last();
        assert!(t.update_last("too late").is_err());
    }

    #[test]
    fn test_append_freezes_open_message() {
        let mut t = transcript();
        t.open_assistant();
        t.append(MessageRole::User, "interleaved");
        assert!(!t.has_open_message());
        assert!(t.update_last("no").is_err());
    }

    #[test]
    fn test_cursor_is_monotone_and_bounded() {
        let mut t = transcript();
        t.append(MessageRole::User, "a");
        t.append(MessageRole::Assistant, "b");

        assert_eq!(t.cursor(), 0);
        t.advance_cursor(10);
        assert_eq!(t.cursor(), 2); // clamped to length

        t.advance_cursor(1);
        assert_eq!(t.cursor(), 2); // never rewinds

        t.append(MessageRole::User, "c");
        assert_eq!(t.unsynced().len(), 1);
        t.advance_cursor(3);
        assert!(t.fully_synced());
    }

    #[test]
    fn test_page_urls_deduplicated() {
        let mut t = transcript();
        t.record_page_url("https://example.com/a");
        t.record_page_url("https://example.com/b");
        t.record_page_url("https://example.com/a");
        assert_eq!(t.page_urls().len(), 2);
    }

    #[test]
    fn test_open_flag_not_persisted() {
        let mut t = transcript();
        t.open_assistant();
        t.update_last("streaming").unwrap();

        let json = serde_json::to_string(&t).unwrap();
        let mut back: Transcript = serde_json::from_str(&json).unwrap();
        assert!(!back.has_open_message());
        assert!(back.update_last("frozen").is_err());
    }
}
