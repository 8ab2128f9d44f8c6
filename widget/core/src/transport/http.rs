//! HTTP Chat Transport
//!
//! `POST {base_url}/chat` with `{message, chatHistory, clientId}`, answered by
//! `{gemini_response, premium_applicable}`.

use std::time::Duration;

use async_trait::async_trait;

use super::wire::{ChatRequest, ChatResponseBody};
use super::{ChatReply, ChatTransport, TransportError};
use crate::messages::{ClientId, Message};

/// Live chat transport over reqwest
#[derive(Clone, Debug)]
pub struct HttpChatTransport {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpChatTransport {
    /// Transport for a backend at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Chat endpoint URL
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send_message(
        &self,
        text: &str,
        history: &[Message],
        client_id: &ClientId,
    ) -> Result<ChatReply, TransportError> {
        let body = ChatRequest {
            message: text,
            chat_history: history,
            client_id,
        };

        let response = self
            .http_client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(TransportError::Network)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, body = %body, "Chat endpoint returned error status");
            return Err(TransportError::Status { status, body });
        }

        let bytes = response.bytes().await.map_err(TransportError::Network)?;
        let decoded: ChatResponseBody =
            serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(decoded.into())
    }
}
