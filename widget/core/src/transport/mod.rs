//! Transport Adapter
//!
//! The widget's two links to the backend:
//! - [`ChatTransport`]: one request/response call per turn (`POST /chat`)
//! - [`StatusConnector`]: the persistent status channel (`/ws/{clientId}`),
//!   driven forever by a [`StatusListener`]
//!
//! # Design Philosophy
//!
//! Transports never touch session state. They return results; the widget
//! applies them. Live and scripted implementations sit behind the same
//! traits so the widget can pick one at runtime from its mode flag.

pub mod http;
pub mod listener;
pub mod scripted;
#[cfg(feature = "websocket")]
pub mod websocket;
pub mod wire;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::messages::{ClientId, Message};

pub use http::HttpChatTransport;
pub use listener::{ListenerEvent, ListenerHandle, StatusListener};
pub use scripted::{ScriptedBackend, ScriptedStatusConnector, ScriptedTransport};
#[cfg(feature = "websocket")]
pub use websocket::WsStatusConnector;

/// Result of one chat call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    /// Assistant answer text
    pub answer_text: String,
    /// Whether a premium answer is being prepared for this turn
    pub premium_applicable: bool,
}

/// Chat call failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server answered with a non-success status
    #[error("HTTP error! status: {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, kept for logs
        body: String,
    },

    /// Request never completed
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Body was not the expected JSON
    #[error("failed to decode chat response: {0}")]
    Decode(String),

    /// Transport cannot be used (e.g. client construction failed)
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Status channel failures
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Could not open the channel
    #[error("failed to connect status channel: {0}")]
    Connect(String),

    /// Channel broke while reading
    #[error("status channel receive failed: {0}")]
    Receive(String),

    /// Frame was not valid JSON for a status push
    #[error("undecodable status frame: {0}")]
    Decode(String),

    /// `completed` frame without its `data` object
    #[error("completed status without payload")]
    MissingPayload,

    /// `status` value not recognized
    #[error("unknown status: {0}")]
    UnknownStatus(String),
}

/// Raw text frames from an open status channel; ends when the channel closes
pub type StatusStream = BoxStream<'static, Result<String, ChannelError>>;

/// Request/response chat call
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &'static str;

    /// Send `text` with the full conversation so far
    ///
    /// `history` already contains the user entry for `text`.
    async fn send_message(
        &self,
        text: &str,
        history: &[Message],
        client_id: &ClientId,
    ) -> Result<ChatReply, TransportError>;
}

/// Opens the status channel for a client
#[async_trait]
pub trait StatusConnector: Send + Sync {
    /// Connector name for logs
    fn name(&self) -> &'static str;

    /// Open the channel; the returned stream yields frames until it closes
    async fn connect(&self, client_id: &ClientId) -> Result<StatusStream, ChannelError>;
}
