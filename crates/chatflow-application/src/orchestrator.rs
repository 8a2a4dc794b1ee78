//! End-to-end driver for one conversation turn.
//!
//! Ties the pieces together: records the user message, opens an assistant
//! message, feeds the transport's fragment stream through the pacer, and
//! finalizes/persists/syncs when the stream ends. A non-streaming path
//! covers hosts that opt out of incremental rendering.

use crate::pacer::Pacer;
use crate::sync_agent::SyncAgent;
use async_trait::async_trait;
use chatflow_core::sanitize::sanitize_and_normalize;
use chatflow_core::session::Session;
use chatflow_core::transcript::Transcript;
use chatflow_core::message::MessageRole;
use chatflow_core::Result;
use chatflow_infrastructure::ActiveTranscriptStore;
use chatflow_transport::{AssistantClient, ChatAnswer, FragmentStream, TransportError};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Shown when the non-streaming endpoint returns an empty answer.
const EMPTY_ANSWER_FALLBACK: &str = "(no answer)";
/// Shown when the non-streaming exchange fails outright.
const EXCHANGE_FAILED_FALLBACK: &str = "Sorry, something went wrong. Please try again.";

/// Outbound exchange with the assistant backend. Implemented by
/// [`AssistantClient`]; tests swap in scripted doubles.
#[async_trait]
pub trait AssistantExchange: Send + Sync {
    async fn stream_chat(
        &self,
        session_id: &str,
        message: &str,
    ) -> std::result::Result<FragmentStream, TransportError>;

    async fn ask(
        &self,
        session_id: &str,
        message: &str,
    ) -> std::result::Result<ChatAnswer, TransportError>;
}

#[async_trait]
impl AssistantExchange for AssistantClient {
    async fn stream_chat(
        &self,
        session_id: &str,
        message: &str,
    ) -> std::result::Result<FragmentStream, TransportError> {
        AssistantClient::stream_chat(self, session_id, message).await
    }

    async fn ask(
        &self,
        session_id: &str,
        message: &str,
    ) -> std::result::Result<ChatAnswer, TransportError> {
        AssistantClient::ask(self, session_id, message).await
    }
}

/// Completed turn as it should appear in the conversation view.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// Safe markup for the assistant bubble.
    pub content: String,
    /// Source links reported alongside a non-streamed answer.
    pub sources: Vec<String>,
    /// True when the turn ended in an error notice instead of an answer.
    pub failed: bool,
}

pub struct StreamOrchestrator {
    session: Session,
    transcript: Arc<Mutex<Transcript>>,
    exchange: Arc<dyn AssistantExchange>,
    pacer: Pacer,
    sync: Arc<SyncAgent>,
    active: Arc<ActiveTranscriptStore>,
    cancel: CancellationToken,
    page_url: Option<String>,
}

impl StreamOrchestrator {
    pub fn new(
        session: Session,
        transcript: Arc<Mutex<Transcript>>,
        exchange: Arc<dyn AssistantExchange>,
        pacer: Pacer,
        sync: Arc<SyncAgent>,
        active: Arc<ActiveTranscriptStore>,
    ) -> Self {
        Self {
            session,
            transcript,
            exchange,
            pacer,
            sync,
            active,
            cancel: CancellationToken::new(),
            page_url: None,
        }
    }

    /// Records the page the widget is mounted on; attached to the
    /// transcript at the start of every turn.
    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Sends one user message and streams the reply, invoking `render`
    /// with the cumulative safe markup on every reveal tick.
    pub async fn send_streaming<F>(&self, message: &str, mut render: F) -> Result<ChatTurn>
    where
        F: FnMut(&str),
    {
        self.record_user_turn(message);

        let turn = match self
            .exchange
            .stream_chat(&self.session.session_id, message)
            .await
        {
            Ok(fragments) => {
                let transcript = Arc::clone(&self.transcript);
                let outcome = self
                    .pacer
                    .run(fragments, &self.cancel, |safe| {
                        // Keep the open assistant message current so a crash
                        // mid-stream loses at most one tick of text.
                        if let Ok(mut t) = transcript.lock() {
                            let _ = t.update_last(safe);
                        }
                        render(safe);
                    })
                    .await;
                ChatTurn {
                    content: outcome.safe_content,
                    sources: Vec::new(),
                    failed: outcome.error.is_some(),
                }
            }
            Err(err) => {
                // A failed request can carry an HTML error body (proxies do
                // this); the notice goes through the sanitizer like any
                // other assistant content.
                let notice = sanitize_and_normalize(&err.display_text());
                render(&notice);
                ChatTurn {
                    content: notice,
                    sources: Vec::new(),
                    failed: true,
                }
            }
        };

        self.finalize_turn(&turn)?;
        Ok(turn)
    }

    /// Sends one user message over the non-streaming endpoint.
    pub async fn send_json(&self, message: &str) -> Result<ChatTurn> {
        self.record_user_turn(message);

        let turn = match self.exchange.ask(&self.session.session_id, message).await {
            Ok(answer) => {
                let raw = if answer.answer.trim().is_empty() {
                    EMPTY_ANSWER_FALLBACK.to_string()
                } else {
                    answer.answer
                };
                ChatTurn {
                    content: sanitize_and_normalize(&raw),
                    sources: answer.sources,
                    failed: false,
                }
            }
            Err(err) => {
                warn!("exchange failed: {}", err);
                ChatTurn {
                    content: EXCHANGE_FAILED_FALLBACK.to_string(),
                    sources: Vec::new(),
                    failed: true,
                }
            }
        };

        self.finalize_turn(&turn)?;
        Ok(turn)
    }

    /// Aborts any in-flight stream and fires the teardown flush. Called
    /// when the widget is being torn down with the page.
    pub fn dispose(&self) {
        self.cancel.cancel();
        self.sync.teardown_flush();
    }

    fn record_user_turn(&self, message: &str) {
        let mut transcript = self.lock_transcript();
        if let Some(url) = &self.page_url {
            transcript.record_page_url(url.clone());
        }
        transcript.append(MessageRole::User, sanitize_and_normalize(message));
        drop(transcript);
        self.sync.schedule_flush();
        self.lock_transcript().open_assistant();
    }

    fn finalize_turn(&self, turn: &ChatTurn) -> Result<()> {
        {
            let mut transcript = self.lock_transcript();
            transcript.update_last(&turn.content)?;
            transcript.finalize_last();
        }
        self.persist_and_sync();
        Ok(())
    }

    fn persist_and_sync(&self) {
        {
            let transcript = self.lock_transcript();
            if let Err(err) = self.active.save(&transcript) {
                warn!("failed to save active transcript: {}", err);
            }
        }
        self.sync.schedule_flush();
    }

    fn lock_transcript(&self) -> std::sync::MutexGuard<'_, Transcript> {
        match self.transcript.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Renders a source-link footer for a turn that reported sources.
pub fn sources_markup(sources: &[String]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let links: Vec<String> = sources
        .iter()
        .map(|s| format!("<a href=\"{s}\">source</a>"))
        .collect();
    format!("Sources: {}", links.join(" · "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_agent::SyncAgent;
    use chatflow_core::config::PacerConfig;
    use chatflow_core::delivery::{TranscriptDelivery, TranscriptPayload};
    use chatflow_infrastructure::DurableTranscriptStore;
    use futures::stream;
    use std::time::Duration;
    use tempfile::TempDir;

    struct NullDelivery;

    #[async_trait]
    impl TranscriptDelivery for NullDelivery {
        async fn deliver(&self, _payload: &TranscriptPayload) -> std::result::Result<(), String> {
            Ok(())
        }
        fn deliver_detached(&self, _payload: TranscriptPayload) {}
    }

    struct ScriptedExchange {
        fragments: Vec<std::result::Result<String, TransportError>>,
        stream_failure: Option<(u16, String)>,
        answer: std::result::Result<ChatAnswer, TransportError>,
    }

    impl ScriptedExchange {
        fn streaming(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|s| Ok(s.to_string())).collect(),
                stream_failure: None,
                answer: Err(TransportError::Aborted),
            }
        }

        fn failing_stream(status: u16, body: &str) -> Self {
            Self {
                fragments: Vec::new(),
                stream_failure: Some((status, body.to_string())),
                answer: Err(TransportError::Aborted),
            }
        }

        fn answering(answer: std::result::Result<ChatAnswer, TransportError>) -> Self {
            Self {
                fragments: Vec::new(),
                stream_failure: None,
                answer,
            }
        }
    }

    #[async_trait]
    impl AssistantExchange for ScriptedExchange {
        async fn stream_chat(
            &self,
            _session_id: &str,
            _message: &str,
        ) -> std::result::Result<FragmentStream, TransportError> {
            if let Some((status, body)) = &self.stream_failure {
                return Err(TransportError::Status {
                    status: *status,
                    body: body.clone(),
                });
            }
            let items: Vec<_> = self
                .fragments
                .iter()
                .map(|r| r.as_ref().map(String::clone).map_err(|_| TransportError::Aborted))
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }

        async fn ask(
            &self,
            _session_id: &str,
            _message: &str,
        ) -> std::result::Result<ChatAnswer, TransportError> {
            match &self.answer {
                Ok(a) => Ok(a.clone()),
                Err(_) => Err(TransportError::Aborted),
            }
        }
    }

    fn orchestrator_in(dir: &TempDir, exchange: ScriptedExchange) -> StreamOrchestrator {
        let session = Session {
            session_id: "sess-1".to_string(),
            visitor_id: "vis-1".to_string(),
        };
        let transcript = Arc::new(Mutex::new(Transcript::new(
            &session.session_id,
            &session.visitor_id,
        )));
        let durable = Arc::new(DurableTranscriptStore::new(dir.path()).unwrap());
        let sync = Arc::new(SyncAgent::with_debounce(
            Arc::clone(&transcript),
            Arc::new(NullDelivery) as Arc<dyn TranscriptDelivery>,
            durable,
            Duration::from_millis(10),
        ));
        let active = Arc::new(ActiveTranscriptStore::new(dir.path()).unwrap());
        let pacer = Pacer::new(PacerConfig {
            tick_interval_ms: 1,
            max_chars_per_tick: 60,
            min_merge_chars: 16,
        });
        StreamOrchestrator::new(session, transcript, Arc::new(exchange), pacer, sync, active)
            .with_page_url("https://example.com/shop")
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_turn_records_both_messages() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator_in(
            &dir,
            ScriptedExchange::streaming(&["<p>Hello", " there</p>"]),
        );

        let turn = orchestrator
            .send_streaming("hi <b>bold</b>", |_| {})
            .await
            .unwrap();

        assert!(!turn.failed);
        assert_eq!(turn.content, "<p>Hello there</p>");

        let transcript = orchestrator.transcript.lock().unwrap();
        assert_eq!(transcript.len(), 2);
        let messages = transcript.messages();
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "hi <b>bold</b>");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "<p>Hello there</p>");
        assert!(!transcript.has_open_message());
        assert_eq!(transcript.page_urls(), &["https://example.com/shop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_never_exposes_unsafe_markup() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator_in(
            &dir,
            ScriptedExchange::streaming(&["<p>Hel", "lo <scr", "ipt>bad</scri", "pt> world</p>"]),
        );

        let renders = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&renders);
        let turn = orchestrator
            .send_streaming("hi", move |safe| {
                sink.lock().unwrap().push(safe.to_string())
            })
            .await
            .unwrap();

        assert_eq!(turn.content, "<p>Hello  world</p>");
        for safe in renders.lock().unwrap().iter() {
            assert!(!safe.contains("bad"));
            assert!(!safe.contains("<scr"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_stream_request_notice_is_sanitized() {
        // Proxies answer non-2xx with HTML error pages; the body must not
        // reach the transcript or the render sink unsanitized.
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator_in(
            &dir,
            ScriptedExchange::failing_stream(
                502,
                "<script>alert(1)</script><p onclick=\"x()\">bad gateway</p>",
            ),
        );

        let renders = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&renders);
        let turn = orchestrator
            .send_streaming("hi", move |safe| {
                sink.lock().unwrap().push(safe.to_string())
            })
            .await
            .unwrap();

        assert!(turn.failed);
        assert!(turn.content.starts_with("Server error: 502"));
        assert!(!turn.content.contains("<script>"));
        assert!(!turn.content.contains("alert(1)"));
        assert!(!turn.content.contains("onclick"));
        assert!(turn.content.contains("bad gateway"));

        let transcript = orchestrator.transcript.lock().unwrap();
        let stored = &transcript.messages()[1].content;
        assert_eq!(stored, &turn.content);
        for safe in renders.lock().unwrap().iter() {
            assert!(!safe.contains("<script>"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_json_turn_sanitizes_and_reports_sources() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator_in(
            &dir,
            ScriptedExchange::answering(Ok(ChatAnswer {
                answer: "<p onclick=\"x()\">Answer</p>".to_string(),
                sources: vec!["https://example.com/doc".to_string()],
                latency_ms: Some(12),
            })),
        );

        let turn = orchestrator.send_json("question").await.unwrap();

        assert!(!turn.failed);
        assert_eq!(turn.content, "<p>Answer</p>");
        assert_eq!(turn.sources, vec!["https://example.com/doc"]);
        assert_eq!(
            sources_markup(&turn.sources),
            "Sources: <a href=\"https://example.com/doc\">source</a>"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_json_turn_empty_answer_falls_back() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator_in(
            &dir,
            ScriptedExchange::answering(Ok(ChatAnswer {
                answer: "   ".to_string(),
                sources: Vec::new(),
                latency_ms: None,
            })),
        );

        let turn = orchestrator.send_json("question").await.unwrap();
        assert_eq!(turn.content, "(no answer)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_json_turn_failure_shows_fixed_notice() {
        let dir = TempDir::new().unwrap();
        let orchestrator =
            orchestrator_in(&dir, ScriptedExchange::answering(Err(TransportError::Aborted)));

        let turn = orchestrator.send_json("question").await.unwrap();
        assert!(turn.failed);
        assert_eq!(turn.content, "Sorry, something went wrong. Please try again.");
        // The notice still lands in the transcript as the assistant turn.
        let transcript = orchestrator.transcript.lock().unwrap();
        assert_eq!(transcript.messages()[1].content, turn.content);
    }

    #[test]
    fn test_sources_markup_empty() {
        assert_eq!(sources_markup(&[]), "");
    }
}
