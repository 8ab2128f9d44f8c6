//! Widget Events
//!
//! Two inbound event families:
//! - [`WidgetEvent`]: user actions reported by the surface
//! - [`StatusEvent`]: decoded pushes from the status channel
//!
//! Surfaces report what happened; the widget decides what it means.

use serde::{Deserialize, Serialize};

use crate::monetization::CreditOption;
use crate::payload::PremiumPayload;

/// Intermediate stage of a premium request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusStage {
    /// Searching partner documents
    Searching,
    /// Searching partner videos
    SearchingVideos,
    /// Composing the premium answer
    Synthesizing,
}

/// A status push for the premium request of the current turn
///
/// Per turn the server sends `Started`, zero or more `Progress`, then exactly
/// one of `Completed` or `Error`.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusEvent {
    /// Premium generation began
    Started,
    /// Premium generation is in a named stage
    Progress {
        /// Which stage
        stage: StatusStage,
        /// Server-provided description
        message: String,
    },
    /// Premium generation finished
    Completed {
        /// The finished payload
        payload: PremiumPayload,
    },
    /// Premium generation failed server-side
    Error {
        /// Server-provided description
        message: String,
    },
}

impl StatusEvent {
    /// Text for a status line
    #[must_use]
    pub fn status_text(&self) -> String {
        match self {
            Self::Started => "Premium response generation started".to_string(),
            Self::Progress { message, .. } => message.clone(),
            Self::Completed { .. } => "Premium response completed".to_string(),
            Self::Error { message } => format!("Premium response error: {message}"),
        }
    }

    /// Short name for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Progress { .. } => "progress",
            Self::Completed { .. } => "completed",
            Self::Error { .. } => "error",
        }
    }
}

/// User actions from the surface to the widget
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetEvent {
    /// User submitted a chat message
    Submit {
        /// Raw input text
        text: String,
    },
    /// User pressed "Try now" on the upsell chip
    OpenUpgradeOptions,
    /// User chose "Watch an Ad"
    WatchAd,
    /// User pressed the ad's skip button
    SkipAd,
    /// User chose "Buy Credits"
    BuyCredits,
    /// User picked a credit package
    SelectCredits {
        /// The chosen package
        option: CreditOption,
    },
    /// User pressed "Buy" in the credits dialog
    ConfirmPurchase,
    /// User closed the credits dialog
    CloseCredits,
    /// User chose "No Thanks"
    ContinueFree,
    /// Surface is going away
    Shutdown,
}
