//! Transcript sync delivery over HTTP.
//!
//! Implements the [`TranscriptDelivery`] seam: a normal awaited POST for
//! in-session flushes and a detached, beacon-style send for page teardown
//! where an awaited request would be cancelled by navigation.

use crate::config::TransportConfig;
use async_trait::async_trait;
use chatflow_core::delivery::{TranscriptDelivery, TranscriptPayload};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(20);

/// Delivers transcript payloads to the owning system's save endpoint.
#[derive(Clone)]
pub struct HttpTranscriptDelivery {
    client: Client,
    save_url: String,
    auth_token: String,
}

/// Wire envelope: the auth token travels in the body, and in the query
/// string for delivery paths that cannot set a body-aware reader.
#[derive(Serialize)]
struct SaveRequest<'a> {
    token: &'a str,
    #[serde(flatten)]
    payload: &'a TranscriptPayload,
}

impl HttpTranscriptDelivery {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            client: Client::new(),
            save_url: config.save_url.clone(),
            auth_token: config.auth_token.clone(),
        }
    }
}

#[async_trait]
impl TranscriptDelivery for HttpTranscriptDelivery {
    async fn deliver(&self, payload: &TranscriptPayload) -> Result<(), String> {
        let response = self
            .client
            .post(&self.save_url)
            .query(&[("token", self.auth_token.as_str())])
            .timeout(DELIVERY_TIMEOUT)
            .json(&SaveRequest {
                token: &self.auth_token,
                payload,
            })
            .send()
            .await
            .map_err(|err| format!("transcript sync request failed: {err}"))?;

        if !response.status().is_success() {
            return Err(format!(
                "transcript sync rejected: {}",
                response.status()
            ));
        }
        Ok(())
    }

    fn deliver_detached(&self, payload: TranscriptPayload) {
        let delivery = self.clone();
        tokio::spawn(async move {
            if let Err(err) = delivery.deliver(&payload).await {
                tracing::debug!("teardown transcript sync failed (dropped): {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_core::message::{Message, MessageRole};

    #[test]
    fn test_save_request_wire_shape() {
        let payload = TranscriptPayload {
            session_id: "sid".into(),
            visitor_id: "vid".into(),
            started_at: 1,
            last_active: 2,
            page_urls: vec!["https://example.com".into()],
            messages: vec![Message {
                role: MessageRole::User,
                content: "<p>hi</p>".into(),
                timestamp: "2024-01-01T00:00:00Z".into(),
            }],
        };
        let json = serde_json::to_value(SaveRequest {
            token: "tok",
            payload: &payload,
        })
        .unwrap();

        assert_eq!(json["token"], "tok");
        assert_eq!(json["session_id"], "sid");
        assert_eq!(json["visitor_id"], "vid");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "<p>hi</p>");
    }
}
