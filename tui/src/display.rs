//! Display State Types
//!
//! What the terminal currently shows, derived from [`WidgetMessage`]s.
//!
//! # Design Philosophy
//!
//! The TUI is a thin client: it renders what the widget tells it to. The
//! widget decides *what* fragment to show; this module only remembers it
//! long enough to draw it every frame.

use std::time::Duration;

use datasense_core::{
    CreditOption, Fragment, MonetizationState, NotifyLevel, OrderSummary, PremiumCards,
    WidgetMessage,
};

/// How long a toast stays on screen
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

/// A rendered conversation entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayEntry {
    /// Who (or what) produced this entry
    pub role: DisplayRole,
    /// The entry text
    pub content: String,
    /// Upsell chip label, present on the answer that offered premium
    pub chip: Option<String>,
}

impl DisplayEntry {
    /// Create an entry without a chip
    pub fn new(role: DisplayRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            chip: None,
        }
    }
}

/// Display role for entries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayRole {
    /// User input
    User,
    /// Free assistant answer
    Assistant,
    /// Revealed premium answer
    Premium,
    /// Partner video card
    Video,
    /// Partner document card
    Document,
}

impl DisplayRole {
    /// Get the prefix for this role
    pub fn prefix(&self) -> &'static str {
        match self {
            DisplayRole::User => "You: ",
            DisplayRole::Assistant => "DataSense: ",
            DisplayRole::Premium => "DataSense Premium: ",
            DisplayRole::Video => "  [video] ",
            DisplayRole::Document => "  [pdf] ",
        }
    }
}

/// A dialog drawn above the conversation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Overlay {
    /// Watch-ad / buy-credits / no-thanks choices
    UpgradeModal,
    /// Ad playing, with the skip countdown
    Ad {
        /// Units until skip is allowed
        skip_in: u32,
    },
    /// Credits purchase dialog
    Credits {
        /// Selected package
        selection: CreditOption,
        /// Order summary
        summary: OrderSummary,
    },
}

/// A short-lived confirmation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayToast {
    /// Toast text
    pub text: String,
    /// Time left on screen
    pub remaining: Duration,
}

/// A notice for the status bar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayNotice {
    /// Severity
    pub level: NotifyLevel,
    /// Notice text
    pub text: String,
}

/// The full display state for the TUI
#[derive(Debug, Default)]
pub struct DisplayState {
    /// Conversation entries
    pub entries: Vec<DisplayEntry>,
    /// Latest premium-request progress line (if any)
    pub status_line: Option<String>,
    /// Current dialog (if any)
    pub overlay: Option<Overlay>,
    /// Current toast (if any)
    pub toast: Option<DisplayToast>,
    /// Latest notice (if any)
    pub notice: Option<DisplayNotice>,
    /// Whether a chat turn is in flight
    pub busy: bool,
    /// Whether the status channel is open
    pub channel_connected: bool,
    /// Monetization state as last announced
    pub monetization: MonetizationState,
    /// The widget has shut down
    pub closed: bool,
}

impl DisplayState {
    /// Create a new display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a widget message to update display state
    pub fn apply_message(&mut self, msg: WidgetMessage) {
        match msg {
            WidgetMessage::Render { fragment } => self.apply_fragment(fragment),
            WidgetMessage::Busy { busy } => self.busy = busy,
            WidgetMessage::Monetization { state } => self.monetization = state,
            WidgetMessage::Channel { connected } => self.channel_connected = connected,
            WidgetMessage::Notice { level, text } => {
                self.notice = Some(DisplayNotice { level, text });
            }
            WidgetMessage::Closed => self.closed = true,
        }
    }

    fn apply_fragment(&mut self, fragment: Fragment) {
        match fragment {
            Fragment::UserMessage { text } => {
                self.status_line = None;
                self.entries.push(DisplayEntry::new(DisplayRole::User, text));
            }
            Fragment::PlainAnswer { text } => {
                self.entries
                    .push(DisplayEntry::new(DisplayRole::Assistant, text));
            }
            Fragment::AnswerWithUpsell { text, chip } => {
                // Only the newest answer carries a live chip
                for entry in &mut self.entries {
                    entry.chip = None;
                }
                self.entries.push(DisplayEntry {
                    role: DisplayRole::Assistant,
                    content: text,
                    chip: Some(chip),
                });
            }
            Fragment::StatusLine { text } => self.status_line = Some(text),
            Fragment::PremiumCards(cards) => {
                self.status_line = None;
                self.push_cards(cards);
            }
            Fragment::UpgradeModal => self.overlay = Some(Overlay::UpgradeModal),
            Fragment::AdOverlay { skip_in } => self.overlay = Some(Overlay::Ad { skip_in }),
            Fragment::CreditsDialog { selection, summary } => {
                self.overlay = Some(Overlay::Credits { selection, summary });
            }
            Fragment::DismissOverlay => self.overlay = None,
            Fragment::Toast { text } => {
                self.toast = Some(DisplayToast {
                    text,
                    remaining: TOAST_DURATION,
                });
            }
        }
    }

    fn push_cards(&mut self, cards: PremiumCards) {
        self.entries
            .push(DisplayEntry::new(DisplayRole::Premium, cards.answer_text));

        for video in cards.videos {
            self.entries.push(DisplayEntry::new(
                DisplayRole::Video,
                format!(
                    "{} ({}) {}",
                    video.display_name, video.partner_name, video.link
                ),
            ));
        }

        for doc in cards.documents {
            let snippet = doc.snippet_text();
            self.entries.push(DisplayEntry::new(
                DisplayRole::Document,
                format!(
                    "{} (p. {}): {} {}",
                    doc.title, doc.page_number, snippet, doc.link_with_page
                ),
            ));
        }
    }

    /// Update timers
    pub fn update(&mut self, delta: Duration) {
        if let Some(toast) = &mut self.toast {
            toast.remaining = toast.remaining.saturating_sub(delta);
            if toast.remaining.is_zero() {
                self.toast = None;
            }
        }
    }

    /// Whether the upsell chip can currently be acted on
    pub fn chip_active(&self) -> bool {
        self.monetization == MonetizationState::UpsellOffered
    }

    /// Clear the notice
    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}
