//! Status Listener
//!
//! Keeps the status channel open for the lifetime of the widget. On close or
//! connect failure it waits a fixed delay and reconnects; there is no backoff
//! growth and no retry cap. Frames that do not decode are logged and skipped.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::wire::decode_status;
use super::{ChannelError, StatusConnector};
use crate::events::StatusEvent;
use crate::messages::ClientId;

/// What the listener reports to the widget
#[derive(Clone, Debug, PartialEq)]
pub enum ListenerEvent {
    /// Channel opened
    Connected {
        /// 1-based connection attempt number
        attempt: u64,
    },
    /// A decoded status push
    Status(StatusEvent),
    /// Channel closed or failed to open; a reconnect follows after `retry_in`
    Disconnected {
        /// Why
        reason: String,
        /// Delay before the next attempt
        retry_in: Duration,
    },
}

/// Reconnecting driver for a [`StatusConnector`]
pub struct StatusListener {
    connector: Arc<dyn StatusConnector>,
    client_id: ClientId,
    reconnect_delay: Duration,
    tx: mpsc::Sender<ListenerEvent>,
}

impl StatusListener {
    /// Create a listener that reports into `tx`
    pub fn new(
        connector: Arc<dyn StatusConnector>,
        client_id: ClientId,
        reconnect_delay: Duration,
        tx: mpsc::Sender<ListenerEvent>,
    ) -> Self {
        Self {
            connector,
            client_id,
            reconnect_delay,
            tx,
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime
    #[must_use]
    pub fn spawn(self) -> ListenerHandle {
        ListenerHandle {
            task: tokio::spawn(self.run()),
        }
    }

    /// Run until the receiving side goes away
    pub async fn run(self) {
        tracing::info!(
            connector = self.connector.name(),
            client_id = %self.client_id,
            reconnect_ms = self.reconnect_delay.as_millis() as u64,
            "Starting status listener"
        );

        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let reason = match self.connector.connect(&self.client_id).await {
                Ok(mut stream) => {
                    if self.tx.send(ListenerEvent::Connected { attempt }).await.is_err() {
                        break;
                    }
                    match self.pump(&mut stream).await {
                        Some(reason) => reason,
                        None => break,
                    }
                }
                Err(e) => e.to_string(),
            };

            tracing::warn!(
                attempt,
                reason = %reason,
                retry_ms = self.reconnect_delay.as_millis() as u64,
                "Status channel down, reconnecting"
            );
            let event = ListenerEvent::Disconnected {
                reason,
                retry_in: self.reconnect_delay,
            };
            if self.tx.send(event).await.is_err() {
                break;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }

        tracing::debug!(client_id = %self.client_id, "Status listener stopped");
    }

    /// Forward frames until the channel ends
    ///
    /// Returns the close reason, or `None` if the widget stopped listening.
    async fn pump(&self, stream: &mut super::StatusStream) -> Option<String> {
        while let Some(frame) = stream.next().await {
            let raw = match frame {
                Ok(raw) => raw,
                Err(ChannelError::Decode(e)) => {
                    tracing::warn!(error = %e, "Skipping undecodable status frame");
                    continue;
                }
                Err(e) => return Some(e.to_string()),
            };
            match decode_status(&raw) {
                Ok(event) => {
                    tracing::debug!(kind = event.kind(), "Status push received");
                    if self.tx.send(ListenerEvent::Status(event)).await.is_err() {
                        return None;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Skipping status frame"),
            }
        }
        Some("connection closed".to_string())
    }
}

/// Owned handle to a running listener; aborts it on drop
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stop the listener now
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Whether the listener task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::StatusStream;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct OneShotConnector {
        frames: Vec<&'static str>,
    }

    #[async_trait]
    impl StatusConnector for OneShotConnector {
        fn name(&self) -> &'static str {
            "one-shot"
        }

        async fn connect(&self, _client_id: &ClientId) -> Result<StatusStream, ChannelError> {
            let frames: Vec<Result<String, ChannelError>> =
                self.frames.iter().map(|f| Ok((*f).to_string())).collect();
            Ok(futures::stream::iter(frames).boxed())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwards_and_skips_bad_frames() {
        let connector = Arc::new(OneShotConnector {
            frames: vec![
                r#"{"status":"started"}"#,
                "garbage",
                r#"{"status":"completed"}"#,
                r#"{"status":"error","message":"boom"}"#,
            ],
        });
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = StatusListener::new(
            connector,
            ClientId::from_string("c"),
            Duration::from_secs(5),
            tx,
        )
        .spawn();

        assert_eq!(rx.recv().await, Some(ListenerEvent::Connected { attempt: 1 }));
        assert_eq!(rx.recv().await, Some(ListenerEvent::Status(StatusEvent::Started)));
        assert_eq!(
            rx.recv().await,
            Some(ListenerEvent::Status(StatusEvent::Error {
                message: "boom".into()
            }))
        );
        assert!(matches!(
            rx.recv().await,
            Some(ListenerEvent::Disconnected { .. })
        ));
        assert_eq!(rx.recv().await, Some(ListenerEvent::Connected { attempt: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_receiver_dropped() {
        let connector = Arc::new(OneShotConnector { frames: vec![] });
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = StatusListener::new(
            connector,
            ClientId::from_string("c"),
            Duration::from_secs(5),
            tx,
        )
        .spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_finished());
    }
}
