//! Chat Widget
//!
//! The session object that owns everything: configuration, session state,
//! the monetization machine, transports, timers and the status listener.
//!
//! A host constructs one widget per session, forwards user actions with
//! [`ChatWidget::handle_event`], and calls [`ChatWidget::poll`] regularly.
//! All state changes happen inside those two calls, on the host's task.
//! Chat calls and the status listener run on spawned tasks and report back
//! through channels that `poll` drains.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::{WidgetConfig, WidgetMode};
use crate::events::{StatusEvent, WidgetEvent};
use crate::messages::{ClientId, NotifyLevel, WidgetMessage};
use crate::monetization::{
    MonetizationError, MonetizationMachine, MonetizationState, Transition, UnlockCause,
};
use crate::render::{self, Fragment, PURCHASE_TOAST_TEXT};
use crate::scheduler::{Scheduler, TimerSlot};
use crate::session::SessionState;
use crate::transport::{
    ChatReply, ChatTransport, HttpChatTransport, ListenerEvent, ListenerHandle, ScriptedBackend,
    StatusConnector, StatusListener, TransportError,
};

/// Assistant entry substituted when a chat call fails
pub const APOLOGY_TEXT: &str = "Sorry, there was an error processing your request. Please try again.";

/// Assistant entry appended when the user declines the upsell
pub const FALLBACK_TEXT: &str =
    "No problem. Your answer above is based on fair-use content and publicly available data.";

/// Capacity of the listener → widget channel
const LISTENER_CHANNEL_CAPACITY: usize = 100;

/// Ad timer firings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AdTimer {
    Tick,
    Ceiling,
}

type TurnResult = Result<ChatReply, TransportError>;

/// The chat widget
pub struct ChatWidget {
    config: WidgetConfig,
    session: SessionState,
    machine: MonetizationMachine,
    chat: Arc<dyn ChatTransport>,
    connector: Arc<dyn StatusConnector>,
    scheduler: Scheduler<AdTimer>,
    listener: Option<ListenerHandle>,
    listener_tx: mpsc::Sender<ListenerEvent>,
    listener_rx: mpsc::Receiver<ListenerEvent>,
    turn: Option<(JoinHandle<()>, oneshot::Receiver<TurnResult>)>,
    channel_connected: bool,
    tx: mpsc::Sender<WidgetMessage>,
}

impl ChatWidget {
    /// Build a widget whose transports follow `config.mode`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: WidgetConfig, tx: mpsc::Sender<WidgetMessage>) -> anyhow::Result<Self> {
        config.validate()?;
        let (chat, connector): (Arc<dyn ChatTransport>, Arc<dyn StatusConnector>) =
            match config.mode {
                WidgetMode::Live => (
                    Arc::new(HttpChatTransport::new(
                        config.base_url.clone(),
                        config.request_timeout,
                    )?),
                    live_connector(&config)?,
                ),
                WidgetMode::Scripted => {
                    let backend = ScriptedBackend::new(config.ad.time_unit);
                    (
                        Arc::new(backend.demo_transport()),
                        Arc::new(backend.connector()),
                    )
                }
            };
        Ok(Self::with_transports(config, chat, connector, tx))
    }

    /// Build a widget over explicit transports
    #[must_use]
    pub fn with_transports(
        config: WidgetConfig,
        chat: Arc<dyn ChatTransport>,
        connector: Arc<dyn StatusConnector>,
        tx: mpsc::Sender<WidgetMessage>,
    ) -> Self {
        let client_id = config
            .client_id
            .clone()
            .map_or_else(ClientId::new, ClientId::from_string);
        let (listener_tx, listener_rx) = mpsc::channel(LISTENER_CHANNEL_CAPACITY);

        Self {
            machine: MonetizationMachine::new(config.ad.countdown_units),
            session: SessionState::new(client_id),
            config,
            chat,
            connector,
            scheduler: Scheduler::new(),
            listener: None,
            listener_tx,
            listener_rx,
            turn: None,
            channel_connected: false,
            tx,
        }
    }

    /// Start the status listener
    pub async fn start(&mut self) -> anyhow::Result<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        tracing::info!(
            client_id = %self.session.client_id(),
            mode = ?self.config.mode,
            chat = self.chat.name(),
            status = self.connector.name(),
            "Starting chat widget"
        );
        let listener = StatusListener::new(
            Arc::clone(&self.connector),
            self.session.client_id().clone(),
            self.config.reconnect_delay,
            self.listener_tx.clone(),
        );
        self.listener = Some(listener.spawn());
        self.send(WidgetMessage::Monetization {
            state: self.machine.state(),
        })
        .await;
        Ok(())
    }

    /// Session state (read-only)
    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Current monetization state
    #[must_use]
    pub fn monetization_state(&self) -> MonetizationState {
        self.machine.state()
    }

    /// The session's client identity
    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        self.session.client_id()
    }

    /// Whether a chat call is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    /// Whether the status channel is currently open
    #[must_use]
    pub fn is_channel_connected(&self) -> bool {
        self.channel_connected
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Handle a user action from the surface
    pub async fn handle_event(&mut self, event: WidgetEvent) -> anyhow::Result<()> {
        match event {
            WidgetEvent::Submit { text } => self.submit(text).await,
            WidgetEvent::OpenUpgradeOptions => match self.machine.open_upgrade_options() {
                Ok(()) => self.render_fragment(Fragment::UpgradeModal).await,
                Err(e) => self.reject(e).await,
            },
            WidgetEvent::WatchAd => match self.machine.watch_ad() {
                Ok(transition) => {
                    let unit = self.config.ad.time_unit;
                    self.scheduler
                        .schedule_repeating(TimerSlot::AdCountdown, unit, AdTimer::Tick);
                    self.scheduler.schedule_once(
                        TimerSlot::AdCeiling,
                        self.config.ad.ceiling(),
                        AdTimer::Ceiling,
                    );
                    self.announce(transition).await;
                    self.render_current().await;
                }
                Err(e) => self.reject(e).await,
            },
            WidgetEvent::SkipAd => match self.machine.skip_ad() {
                Ok(Transition::Unlocked(cause)) => self.unlock(cause).await,
                Ok(_) => {}
                Err(e) => self.reject(e).await,
            },
            WidgetEvent::BuyCredits => match self.machine.buy_credits() {
                Ok(transition) => {
                    self.announce(transition).await;
                    self.render_current().await;
                }
                Err(e) => self.reject(e).await,
            },
            WidgetEvent::SelectCredits { option } => match self.machine.select_credits(option) {
                Ok(transition) => {
                    self.announce(transition).await;
                    self.render_current().await;
                }
                Err(e) => self.reject(e).await,
            },
            WidgetEvent::ConfirmPurchase => match self.machine.confirm_purchase() {
                Ok((Transition::Unlocked(cause), option)) => {
                    tracing::info!(option = %option, "Credits purchased");
                    self.unlock(cause).await;
                }
                Ok(_) => {}
                Err(e) => self.reject(e).await,
            },
            WidgetEvent::CloseCredits => match self.machine.close_credits() {
                Ok(transition) => {
                    self.render_fragment(Fragment::DismissOverlay).await;
                    self.announce(transition).await;
                }
                Err(e) => self.reject(e).await,
            },
            WidgetEvent::ContinueFree => match self.machine.continue_free() {
                Ok(transition) => {
                    self.announce(transition).await;
                    self.render_fragment(Fragment::DismissOverlay).await;
                    self.session.push_assistant(FALLBACK_TEXT, false);
                    self.render_fragment(Fragment::PlainAnswer {
                        text: FALLBACK_TEXT.to_string(),
                    })
                    .await;
                    let settled = self.machine.finish_decline();
                    self.announce(settled).await;
                }
                Err(e) => self.reject(e).await,
            },
            WidgetEvent::Shutdown => self.shutdown().await,
        }
        Ok(())
    }

    /// Reconcile finished turns, timer firings and status pushes
    ///
    /// Must be called regularly. Returns `true` if anything was processed.
    pub async fn poll(&mut self) -> bool {
        let mut processed = self.poll_turn().await;

        while let Some(timer) = self.scheduler.try_next() {
            processed = true;
            self.on_timer(timer).await;
        }

        while let Ok(event) = self.listener_rx.try_recv() {
            processed = true;
            self.on_listener_event(event).await;
        }

        processed
    }

    /// Cancel timers, the listener and any in-flight turn
    pub async fn shutdown(&mut self) {
        tracing::info!(client_id = %self.session.client_id(), "Shutting down chat widget");
        self.scheduler.cancel_all();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Some((task, _)) = self.turn.take() {
            task.abort();
        }
        self.session.end_turn();
        self.send(WidgetMessage::Closed).await;
    }

    // =========================================================================
    // Turns
    // =========================================================================

    async fn submit(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.session.is_busy() {
            tracing::warn!("Ignoring submit while a turn is in flight");
            self.notify(NotifyLevel::Warning, "Still waiting for the previous answer")
                .await;
            return;
        }

        self.cancel_ad_timers();
        let reset = self.machine.start_turn();
        self.announce(reset).await;

        self.session.begin_turn();
        self.session.push_user(text.clone());
        self.render_fragment(Fragment::UserMessage { text: text.clone() })
            .await;
        self.send(WidgetMessage::Busy { busy: true }).await;

        tracing::info!(
            client_id = %self.session.client_id(),
            history_len = self.session.log().len(),
            "Turn submitted"
        );

        let chat = Arc::clone(&self.chat);
        let history = self.session.log().to_vec();
        let client_id = self.session.client_id().clone();
        let (done_tx, done_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let result = chat.send_message(&text, &history, &client_id).await;
            let _ = done_tx.send(result);
        });
        self.turn = Some((task, done_rx));
    }

    async fn poll_turn(&mut self) -> bool {
        let Some((_, done_rx)) = self.turn.as_mut() else {
            return false;
        };
        let result = match done_rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return false,
            Err(oneshot::error::TryRecvError::Closed) => Err(TransportError::Unavailable(
                "chat task ended without a reply".to_string(),
            )),
        };
        self.turn = None;
        self.session.end_turn();

        match result {
            Ok(reply) => {
                tracing::info!(
                    premium_applicable = reply.premium_applicable,
                    "Turn answered"
                );
                self.session.set_premium_applicable(reply.premium_applicable);
                self.session
                    .push_assistant(reply.answer_text, reply.premium_applicable);
                let transition = self
                    .machine
                    .on_answer(reply.premium_applicable, self.session.is_paid());
                self.announce(transition).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chat request failed");
                self.session.set_premium_applicable(false);
                self.session.push_assistant(APOLOGY_TEXT, false);
            }
        }

        self.render_current().await;
        if self.session.is_paid() {
            if let Some(cards) = render::flush_premium(&mut self.session) {
                self.emit(cards).await;
            }
        }
        self.send(WidgetMessage::Busy { busy: false }).await;
        true
    }

    // =========================================================================
    // Ad timers and unlock
    // =========================================================================

    fn cancel_ad_timers(&mut self) {
        self.scheduler.cancel(TimerSlot::AdCountdown);
        self.scheduler.cancel(TimerSlot::AdCeiling);
    }

    async fn on_timer(&mut self, timer: AdTimer) {
        match timer {
            AdTimer::Tick => match self.machine.countdown_tick() {
                Some(skip_in) => {
                    if skip_in == 0 {
                        self.scheduler.cancel(TimerSlot::AdCountdown);
                    }
                    self.send(WidgetMessage::Monetization {
                        state: self.machine.state(),
                    })
                    .await;
                    self.render_fragment(Fragment::AdOverlay { skip_in }).await;
                }
                None => self.scheduler.cancel(TimerSlot::AdCountdown),
            },
            AdTimer::Ceiling => match self.machine.ad_ceiling() {
                Ok(Transition::Unlocked(cause)) => self.unlock(cause).await,
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Ad ceiling ignored"),
            },
        }
    }

    async fn unlock(&mut self, cause: UnlockCause) {
        self.cancel_ad_timers();
        self.session.mark_paid();
        self.send(WidgetMessage::Monetization {
            state: self.machine.state(),
        })
        .await;
        self.render_fragment(Fragment::DismissOverlay).await;
        if cause == UnlockCause::CreditsPurchased {
            self.render_fragment(Fragment::Toast {
                text: PURCHASE_TOAST_TEXT.to_string(),
            })
            .await;
        }
        self.render_current().await;
    }

    // =========================================================================
    // Status channel
    // =========================================================================

    async fn on_listener_event(&mut self, event: ListenerEvent) {
        match event {
            ListenerEvent::Connected { attempt } => {
                tracing::debug!(attempt, "Status channel up");
                self.channel_connected = true;
                self.send(WidgetMessage::Channel { connected: true }).await;
            }
            ListenerEvent::Disconnected { reason, retry_in } => {
                tracing::debug!(reason = %reason, retry_ms = retry_in.as_millis() as u64, "Status channel down");
                self.channel_connected = false;
                self.send(WidgetMessage::Channel { connected: false }).await;
            }
            ListenerEvent::Status(status) => self.on_status(status).await,
        }
    }

    async fn on_status(&mut self, status: StatusEvent) {
        match &status {
            StatusEvent::Completed { payload } => {
                tracing::info!(
                    videos = payload.video_refs.len(),
                    documents = payload.pdf_documents.len(),
                    "Premium payload received"
                );
                self.session.store_payload(payload.clone());
            }
            StatusEvent::Error { message } => {
                tracing::warn!(error = %message, "Premium response error");
            }
            StatusEvent::Started | StatusEvent::Progress { .. } => {}
        }
        self.session.set_status_text(Some(status.status_text()));

        if self.session.is_busy() && matches!(status, StatusEvent::Completed { .. }) {
            tracing::debug!("Holding premium cards until the answer lands");
            return;
        }

        if let Some(fragment) = render::render(&mut self.session, self.machine.state(), Some(&status))
        {
            self.emit(fragment).await;
        }
    }

    // =========================================================================
    // Surface output
    // =========================================================================

    async fn render_current(&mut self) {
        if let Some(fragment) = render::render(&mut self.session, self.machine.state(), None) {
            self.emit(fragment).await;
        }
    }

    /// Send a planned fragment
    ///
    /// Premium cards go to the surface only; the turn's assistant entry is
    /// already in the log.
    async fn emit(&mut self, fragment: Fragment) {
        if let Fragment::PremiumCards(cards) = &fragment {
            tracing::debug!(
                videos = cards.videos.len(),
                documents = cards.documents.len(),
                "Revealing premium cards"
            );
        }
        self.render_fragment(fragment).await;
    }

    async fn render_fragment(&self, fragment: Fragment) {
        self.send(WidgetMessage::Render { fragment }).await;
    }

    async fn announce(&self, transition: Transition) {
        if matches!(transition, Transition::Moved { .. } | Transition::Unlocked(_)) {
            self.send(WidgetMessage::Monetization {
                state: self.machine.state(),
            })
            .await;
        }
    }

    async fn reject(&self, error: MonetizationError) {
        tracing::warn!(error = %error, state = %self.machine.state(), "Rejected widget action");
        self.notify(NotifyLevel::Warning, &error.to_string()).await;
    }

    async fn notify(&self, level: NotifyLevel, text: &str) {
        self.send(WidgetMessage::Notice {
            level,
            text: text.to_string(),
        })
        .await;
    }

    async fn send(&self, msg: WidgetMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

impl Drop for ChatWidget {
    fn drop(&mut self) {
        if let Some((task, _)) = self.turn.take() {
            task.abort();
        }
    }
}

#[cfg(feature = "websocket")]
fn live_connector(config: &WidgetConfig) -> anyhow::Result<Arc<dyn StatusConnector>> {
    Ok(Arc::new(crate::transport::WsStatusConnector::new(
        config.ws_url.clone(),
    )))
}

#[cfg(not(feature = "websocket"))]
fn live_connector(_config: &WidgetConfig) -> anyhow::Result<Arc<dyn StatusConnector>> {
    anyhow::bail!("live mode needs the `websocket` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::{ScriptedReply, ScriptedTransport};
    use pretty_assertions::assert_eq;

    fn widget_with(replies: Vec<ScriptedReply>) -> (ChatWidget, mpsc::Receiver<WidgetMessage>) {
        let backend = ScriptedBackend::new(std::time::Duration::ZERO);
        let (tx, rx) = mpsc::channel(256);
        let widget = ChatWidget::with_transports(
            WidgetConfig::scripted(),
            Arc::new(ScriptedTransport::new(replies)),
            Arc::new(backend.connector()),
            tx,
        );
        (widget, rx)
    }

    async fn settle(widget: &mut ChatWidget) {
        while widget.is_busy() {
            tokio::task::yield_now().await;
            widget.poll().await;
        }
    }

    #[tokio::test]
    async fn test_submit_empty_is_ignored() {
        let (mut widget, _rx) = widget_with(vec![]);
        widget
            .handle_event(WidgetEvent::Submit { text: "   ".into() })
            .await
            .unwrap();
        assert!(widget.session().log().is_empty());
        assert!(!widget.is_busy());
    }

    #[tokio::test]
    async fn test_failed_turn_appends_apology() {
        let (mut widget, _rx) = widget_with(vec![ScriptedReply::Fail { status: 503 }]);
        widget
            .handle_event(WidgetEvent::Submit { text: "hello".into() })
            .await
            .unwrap();
        settle(&mut widget).await;

        let log = widget.session().log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].content, APOLOGY_TEXT);
        assert!(!log[1].is_premium);
        assert_eq!(widget.monetization_state(), MonetizationState::Free);
    }

    #[tokio::test]
    async fn test_invalid_action_sends_notice() {
        let (mut widget, mut rx) = widget_with(vec![]);
        widget.handle_event(WidgetEvent::SkipAd).await.unwrap();
        match rx.try_recv().unwrap() {
            WidgetMessage::Notice { level, .. } => assert_eq!(level, NotifyLevel::Warning),
            other => panic!("expected notice, got {other:?}"),
        }
        assert_eq!(widget.monetization_state(), MonetizationState::Free);
    }

    #[tokio::test]
    async fn test_configured_client_id_is_used() {
        let (tx, _rx) = mpsc::channel(8);
        let mut config = WidgetConfig::scripted();
        config.client_id = Some("client_fixed".into());
        let widget = ChatWidget::new(config, tx).unwrap();
        assert_eq!(widget.client_id().as_str(), "client_fixed");
    }
}
