//! Remote delivery seams.
//!
//! These traits abstract the two outbound paths the widget core needs from
//! the owning system: transcript sync and the reload-time session-clear
//! notification. Implementations live in the transport crate; tests use
//! hand-rolled in-memory doubles.

use crate::message::Message;
use crate::transcript::Transcript;
use async_trait::async_trait;
use serde::Serialize;

/// Wire payload for the transcript sync endpoint.
///
/// Carries the full message list; the remote side upserts by session id.
/// The delivery implementation attaches the authorization credential.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptPayload {
    pub session_id: String,
    pub visitor_id: String,
    pub started_at: i64,
    pub last_active: i64,
    pub page_urls: Vec<String>,
    pub messages: Vec<Message>,
}

impl TranscriptPayload {
    /// Snapshots a transcript into its sync payload.
    pub fn from_transcript(transcript: &Transcript) -> Self {
        Self {
            session_id: transcript.session_id().to_string(),
            visitor_id: transcript.visitor_id().to_string(),
            started_at: transcript.started_at(),
            last_active: transcript.last_active(),
            page_urls: transcript.page_urls().to_vec(),
            messages: transcript.snapshot(),
        }
    }
}

/// Delivers transcript payloads to the remote store.
#[async_trait]
pub trait TranscriptDelivery: Send + Sync {
    /// Delivers a payload and waits for the outcome. An `Err` leaves the
    /// sync cursor untouched so the tail rides along with the next flush.
    async fn deliver(&self, payload: &TranscriptPayload) -> Result<(), String>;

    /// Fire-and-forget delivery that can outlive the caller; used on page
    /// teardown where an awaited request would be cancelled. Failures are
    /// logged and dropped.
    fn deliver_detached(&self, payload: TranscriptPayload);
}

/// Tells the remote side to drop server-held conversational memory for a
/// session that no longer exists on the client.
pub trait SessionClearNotifier: Send + Sync {
    /// Best effort, failures ignored.
    fn notify_clear_detached(&self, session_id: &str);
}
