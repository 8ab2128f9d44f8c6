//! Widget Messages
//!
//! Conversation log entries, the client identity, and the messages the
//! widget sends to whatever surface is rendering it.
//!
//! # Design Philosophy
//!
//! The widget owns all state. Surfaces are renderers: they receive
//! [`WidgetMessage`]s and draw the [`Fragment`]s inside them, nothing more.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::monetization::MonetizationState;
use crate::render::Fragment;

/// Who authored a conversation entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person typing into the widget
    User,
    /// The backend model
    Assistant,
}

/// One entry in the conversation log
///
/// Serialized exactly as the chat endpoint expects it inside `chatHistory`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the entry
    pub role: MessageRole,
    /// Text content
    pub content: String,
    /// Premium eligibility at the moment the entry was created
    #[serde(rename = "isPremium")]
    pub is_premium: bool,
}

impl Message {
    /// A user entry. User entries are never premium.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            is_premium: false,
        }
    }

    /// An assistant entry with its premium flag fixed at creation
    pub fn assistant(content: impl Into<String>, is_premium: bool) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            is_premium,
        }
    }
}

/// Correlates chat calls with the out-of-band status channel
///
/// Fixed for the lifetime of a widget. Sent in every chat request body and
/// used as the last path segment of the status channel URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Generate a fresh per-session identifier
    #[must_use]
    pub fn new() -> Self {
        Self(format!("client_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Use a caller-provided identifier
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity for surface notices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Something was rejected or degraded
    Warning,
}

/// Messages from the widget to its surface
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetMessage {
    /// Draw a fragment
    Render {
        /// The fragment to draw
        fragment: Fragment,
    },

    /// A turn started or finished
    Busy {
        /// Whether a turn is in flight
        busy: bool,
    },

    /// The monetization machine moved
    Monetization {
        /// New state
        state: MonetizationState,
    },

    /// The status channel connected or dropped
    Channel {
        /// Whether the channel is currently open
        connected: bool,
    },

    /// Short notice for the status bar
    Notice {
        /// Severity
        level: NotifyLevel,
        /// Text to show
        text: String,
    },

    /// The widget has shut down; no further messages follow
    Closed,
}
