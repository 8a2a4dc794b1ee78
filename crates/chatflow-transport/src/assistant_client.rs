//! HTTP client for the assistant service.
//!
//! One streaming exchange (`/chat_stream`, incremental text body), one
//! JSON fallback (`/chat`), and the fire-and-forget session-clear
//! notification sent when a reload invalidates server-held memory.

use crate::config::TransportConfig;
use crate::error::TransportError;
use chatflow_core::delivery::SessionClearNotifier;
use futures::stream::Stream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A live stream of decoded text fragments from the assistant.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Client for the streaming and non-streaming exchange contracts.
#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    config: TransportConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

/// Response of the non-streaming exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

impl AssistantClient {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Opens one streaming exchange.
    ///
    /// The returned stream yields raw text fragments as the transport
    /// delivers them; completion is the end of the stream. A non-success
    /// status is surfaced as a terminal error before any fragment. No
    /// per-fragment timeout is imposed: slow sources reveal slowly, they
    /// do not fail.
    pub async fn stream_chat(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<FragmentStream, TransportError> {
        let response = self
            .client
            .post(self.config.stream_url())
            .json(&ChatRequest {
                session_id,
                message,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(TransportError::Status { status, body });
        }

        Ok(decode_fragments(response.bytes_stream()))
    }

    /// Non-streaming fallback: one request, one JSON answer.
    pub async fn ask(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatAnswer, TransportError> {
        let response = self
            .client
            .post(self.config.chat_url())
            .timeout(REQUEST_TIMEOUT)
            .json(&ChatRequest {
                session_id,
                message,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(TransportError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    async fn clear_session(&self, session_id: &str) -> Result<(), TransportError> {
        self.client
            .get(self.config.clear_url())
            .query(&[("session_id", session_id)])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        Ok(())
    }
}

impl SessionClearNotifier for AssistantClient {
    fn notify_clear_detached(&self, session_id: &str) {
        let client = self.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = client.clear_session(&session_id).await {
                tracing::debug!("session clear for {session_id} failed (ignored): {err}");
            }
        });
    }
}

/// Adapts the byte stream into decoded text fragments.
///
/// Chunk boundaries are byte boundaries, so a multi-byte code point can be
/// torn across chunks; a carry buffer holds the torn tail until the rest
/// arrives. A torn tail at end-of-stream is dropped.
fn decode_fragments<S>(stream: S) -> FragmentStream
where
    S: Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
{
    Box::pin(
        stream
            .scan(Vec::new(), |carry: &mut Vec<u8>, item| {
                let next = match item {
                    Ok(chunk) => {
                        carry.extend_from_slice(&chunk);
                        Ok(take_decodable(carry))
                    }
                    Err(err) => Err(TransportError::Http(err)),
                };
                futures::future::ready(Some(next))
            })
            .filter_map(|item| {
                futures::future::ready(match item {
                    Ok(text) if text.is_empty() => None,
                    other => Some(other),
                })
            }),
    )
}

/// Drains every decodable byte from the carry buffer, leaving only an
/// incomplete trailing code point behind. Invalid sequences become U+FFFD
/// rather than wedging the stream.
fn take_decodable(carry: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(carry) {
            Ok(text) => {
                out.push_str(text);
                carry.clear();
                break;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&carry[..valid]));
                match err.error_len() {
                    Some(bad) => {
                        out.push('\u{FFFD}');
                        carry.drain(..valid + bad);
                    }
                    None => {
                        // Torn code point; wait for the next chunk.
                        carry.drain(..valid);
                        break;
                    }
                }
            }
        }
    }
    out
}
