//! Smooth-reveal pacing for streamed assistant output.
//!
//! Fragments arrive whenever the transport delivers them and are queued
//! without blocking; a periodic tick dequeues one merged, size-capped
//! piece and re-renders. The whole accumulator is re-sanitized on every
//! tick because allow-list filtering has to see complete tags, and tags
//! routinely span fragment boundaries.

use chatflow_core::buffer::StreamBuffer;
use chatflow_core::config::PacerConfig;
use chatflow_core::sanitize::sanitize_and_normalize;
use chatflow_transport::TransportError;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Result of one fully drained stream.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// Final safe markup; exactly what the last render call received.
    pub safe_content: String,
    /// Terminal error text when the transport failed or was aborted.
    /// The text is already appended to `safe_content`.
    pub error: Option<String>,
}

impl StreamOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Bounded-buffer scheduler that reveals a fragment stream at a fixed
/// cadence.
pub struct Pacer {
    config: PacerConfig,
}

impl Pacer {
    pub fn new(config: PacerConfig) -> Self {
        Self { config }
    }

    /// Drives one stream to completion.
    ///
    /// The tick keeps running until the source has signaled completion
    /// *and* the queue has drained, so completion arriving early never
    /// truncates the reveal. On a mid-stream transport failure (or
    /// cancellation) a terminal error fragment is appended so the bubble
    /// ends with a user-visible message, then the loop drains as usual.
    pub async fn run<S, F>(
        &self,
        fragments: S,
        cancel: &CancellationToken,
        mut render: F,
    ) -> StreamOutcome
    where
        S: Stream<Item = Result<String, TransportError>> + Unpin,
        F: FnMut(&str),
    {
        let mut fragments = fragments.fuse();
        let mut buffer = StreamBuffer::new();
        let mut ticker = interval(Duration::from_millis(self.config.tick_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut error: Option<String> = None;
        let mut last_safe = String::new();

        loop {
            tokio::select! {
                next = fragments.next(), if !buffer.is_finished() => {
                    match next {
                        Some(Ok(fragment)) => buffer.push(fragment),
                        Some(Err(err)) => {
                            let notice = err.display_text();
                            buffer.push(format!("\n{notice}"));
                            error = Some(notice);
                            buffer.finish();
                        }
                        None => buffer.finish(),
                    }
                }
                _ = cancel.cancelled(), if !buffer.is_finished() => {
                    let notice = TransportError::Aborted.display_text();
                    buffer.push(format!("\n{notice}"));
                    error = Some(notice);
                    buffer.finish();
                }
                _ = ticker.tick() => {
                    if buffer.next_piece(&self.config).is_some() {
                        last_safe = sanitize_and_normalize(buffer.revealed());
                        render(&last_safe);
                    } else if buffer.is_drained() {
                        break;
                    }
                }
            }
        }

        StreamOutcome {
            safe_content: last_safe,
            error,
        }
    }
}
