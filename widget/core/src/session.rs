//! Session State
//!
//! Everything the widget remembers for the current page session: the
//! conversation log, premium/paid flags, the latest status text and the
//! latest premium payload.
//!
//! # Invariants
//!
//! - The log is append-only and in chronological order.
//! - `paid` only ever goes from `false` to `true` ([`SessionState::mark_paid`]
//!   is the only mutator).
//! - A payload's cards are handed out once. After [`SessionState::take_premium_cards`]
//!   the payload's video and document lists are empty.

use crate::messages::{ClientId, Message};
use crate::payload::PremiumPayload;
use crate::render::PremiumCards;

/// Latest payload plus whether it has been flushed to the surface
#[derive(Clone, Debug)]
struct StoredPayload {
    payload: PremiumPayload,
    /// Payload as it arrived, before its cards were drained
    received: PremiumPayload,
    revealed: bool,
}

/// Per-session widget state
#[derive(Clone, Debug)]
pub struct SessionState {
    client_id: ClientId,
    log: Vec<Message>,
    premium_applicable: bool,
    paid: bool,
    pending_status_text: Option<String>,
    latest_payload: Option<StoredPayload>,
    busy: bool,
}

impl SessionState {
    /// Create an empty session for `client_id`
    #[must_use]
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            log: Vec::new(),
            premium_applicable: false,
            paid: false,
            pending_status_text: None,
            latest_payload: None,
            busy: false,
        }
    }

    /// The session's client identity
    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Conversation log, oldest first
    #[must_use]
    pub fn log(&self) -> &[Message] {
        &self.log
    }

    /// Most recent assistant entry
    #[must_use]
    pub fn last_assistant(&self) -> Option<&Message> {
        self.log
            .iter()
            .rev()
            .find(|m| m.role == crate::messages::MessageRole::Assistant)
    }

    /// Append a user entry
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.log.push(Message::user(content));
    }

    /// Append an assistant entry
    pub fn push_assistant(&mut self, content: impl Into<String>, is_premium: bool) {
        self.log.push(Message::assistant(content, is_premium));
    }

    /// Whether the latest answer was premium-eligible
    #[must_use]
    pub fn premium_applicable(&self) -> bool {
        self.premium_applicable
    }

    /// Record the latest answer's premium eligibility
    pub fn set_premium_applicable(&mut self, applicable: bool) {
        self.premium_applicable = applicable;
    }

    /// Whether the user has unlocked premium content this session
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.paid
    }

    /// Mark the session paid. Returns `true` if this call changed it.
    pub fn mark_paid(&mut self) -> bool {
        let changed = !self.paid;
        self.paid = true;
        changed
    }

    /// Last status line received from the status channel
    #[must_use]
    pub fn pending_status_text(&self) -> Option<&str> {
        self.pending_status_text.as_deref()
    }

    /// Replace the pending status line
    pub fn set_status_text(&mut self, text: Option<String>) {
        self.pending_status_text = text;
    }

    /// Store a completed payload (last write wins)
    ///
    /// A re-delivery of the payload already stored is ignored, so its cards
    /// are not handed out twice. Returns `false` in that case.
    pub fn store_payload(&mut self, payload: PremiumPayload) -> bool {
        if let Some(previous) = &self.latest_payload {
            if previous.received == payload {
                tracing::debug!(revealed = previous.revealed, "Ignoring repeated premium payload");
                return false;
            }
            if !previous.revealed {
                tracing::debug!("Replacing unrevealed premium payload");
            }
        }
        self.latest_payload = Some(StoredPayload {
            received: payload.clone(),
            payload,
            revealed: false,
        });
        true
    }

    /// The latest payload, revealed or not
    #[must_use]
    pub fn latest_payload(&self) -> Option<&PremiumPayload> {
        self.latest_payload.as_ref().map(|p| &p.payload)
    }

    /// Whether a payload is waiting to be shown
    #[must_use]
    pub fn has_unrevealed_payload(&self) -> bool {
        self.latest_payload.as_ref().is_some_and(|p| !p.revealed)
    }

    /// Hand out the latest payload's cards, draining its lists
    ///
    /// Returns `None` when there is no payload or it was already flushed.
    pub fn take_premium_cards(&mut self) -> Option<PremiumCards> {
        let stored = self.latest_payload.as_mut()?;
        if stored.revealed {
            return None;
        }
        stored.revealed = true;
        Some(PremiumCards {
            answer_text: stored.payload.answer_text.clone(),
            videos: std::mem::take(&mut stored.payload.video_refs),
            documents: std::mem::take(&mut stored.payload.pdf_documents),
        })
    }

    /// Whether a turn is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Start a turn. Returns `false` if one is already in flight.
    ///
    /// Drops the previous turn's payload, revealed or not.
    pub fn begin_turn(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        if self.has_unrevealed_payload() {
            tracing::debug!("Discarding unrevealed payload from previous turn");
        }
        self.latest_payload = None;
        self.pending_status_text = None;
        true
    }

    /// Finish the in-flight turn
    pub fn end_turn(&mut self) {
        self.busy = false;
    }
}
