//! Widget Client
//!
//! Thin wrapper around [`ChatWidget`] for TUI integration. The widget is
//! embedded directly (no extra process); the client owns the receiving end
//! of the widget's message channel.
//!
//! # Architecture
//!
//! The TUI doesn't contain any chat or funnel logic. Its job is:
//! 1. Convert key presses and typed commands to `WidgetEvent`s
//! 2. Send them to the widget
//! 3. Receive `WidgetMessage`s
//! 4. Render display state based on messages

use tokio::sync::mpsc;

use datasense_core::{
    ChatWidget, ClientId, MonetizationState, WidgetConfig, WidgetEvent, WidgetMessage,
};

/// Capacity of the widget -> surface channel
const MESSAGE_CAPACITY: usize = 100;

/// Client for communicating with the embedded widget
pub struct WidgetClient {
    /// The embedded widget instance
    widget: ChatWidget,
    /// Receiver for messages from the widget
    rx: mpsc::Receiver<WidgetMessage>,
}

impl WidgetClient {
    /// Create a client around a widget built from `config`
    pub fn new(config: WidgetConfig) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel(MESSAGE_CAPACITY);
        let widget = ChatWidget::new(config, tx)?;
        Ok(Self { widget, rx })
    }

    /// Start the widget (opens the status channel)
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.widget.start().await
    }

    /// Send a user action to the widget
    pub async fn send(&mut self, event: WidgetEvent) -> anyhow::Result<()> {
        self.widget.handle_event(event).await
    }

    /// Submit a chat message
    pub async fn submit(&mut self, text: String) -> anyhow::Result<()> {
        self.send(WidgetEvent::Submit { text }).await
    }

    /// Tell the widget the surface is going away
    pub async fn request_quit(&mut self) -> anyhow::Result<()> {
        self.send(WidgetEvent::Shutdown).await
    }

    /// Drive turns, timers and status pushes (must be called regularly)
    pub async fn poll(&mut self) -> bool {
        self.widget.poll().await
    }

    /// Receive all pending messages from the widget (non-blocking)
    pub fn recv_all(&mut self) -> Vec<WidgetMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Current funnel state
    pub fn state(&self) -> MonetizationState {
        self.widget.monetization_state()
    }

    /// The session's client identity
    pub fn client_id(&self) -> &ClientId {
        self.widget.client_id()
    }
}
