//! WebSocket Status Connector
//!
//! Opens `{ws_base}/ws/{clientId}` and exposes its text frames as a
//! [`StatusStream`]. Pings are answered by tungstenite while reading.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use super::{ChannelError, StatusConnector, StatusStream};
use crate::messages::ClientId;

/// Live status channel over WebSocket
#[derive(Clone, Debug)]
pub struct WsStatusConnector {
    ws_base: String,
}

impl WsStatusConnector {
    /// Connector for a server at `ws_base` (e.g. `ws://localhost:8000`)
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Channel URL for `client_id`
    #[must_use]
    pub fn channel_url(&self, client_id: &ClientId) -> String {
        format!("{}/ws/{}", self.ws_base, client_id)
    }
}

#[async_trait]
impl StatusConnector for WsStatusConnector {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn connect(&self, client_id: &ClientId) -> Result<StatusStream, ChannelError> {
        let url = self.channel_url(client_id);
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        tracing::info!(url = %url, "Status channel connected");

        let frames = ws_stream
            .take_while(|msg| futures::future::ready(!matches!(msg, Ok(WsMessage::Close(_)))))
            .filter_map(|msg| async move {
                match msg {
                    Ok(WsMessage::Text(text)) => Some(Ok(text)),
                    Ok(WsMessage::Binary(bytes)) => Some(
                        String::from_utf8(bytes).map_err(|e| ChannelError::Decode(e.to_string())),
                    ),
                    Ok(_) => None,
                    Err(e) => Some(Err(ChannelError::Receive(e.to_string()))),
                }
            });
        Ok(frames.boxed())
    }
}
