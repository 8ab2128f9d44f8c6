//! Monetization State Machine
//!
//! Tracks where the user is in the premium funnel for the current turn:
//!
//! ```text
//! Free ──answer(premium, !paid)──► UpsellOffered
//!                                     │
//!            ┌────────────────────────┼──────────────────────┐
//!            ▼                        ▼                      ▼
//!        AdPending               CreditsPending        DeclinedToFree
//!   (countdown, ceiling)     (select, confirm, close)          │
//!            │                        │                      ▼
//!            └──────────► Unlocked ◄──┘                     Free
//! ```
//!
//! The machine only decides transitions. Timers live in the
//! [`Scheduler`](crate::scheduler::Scheduler) and side effects in the widget.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credit packages offered in the credits dialog
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditOption {
    /// 25 credits
    #[default]
    Credits25,
    /// 50 credits
    Credits50,
    /// Monthly subscription
    Subscription,
}

impl CreditOption {
    /// All options in display order
    pub const ALL: [CreditOption; 3] = [Self::Credits25, Self::Credits50, Self::Subscription];

    /// Order summary line item
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Credits25 => "25 Premium Data Credits",
            Self::Credits50 => "50 Premium Data Credits",
            Self::Subscription => "Gemini with DataSense Subscription",
        }
    }

    /// Order summary price
    #[must_use]
    pub fn price(self) -> &'static str {
        match self {
            Self::Credits25 => "$25.00",
            Self::Credits50 => "$50.00",
            Self::Subscription => "$149.00/month",
        }
    }

    /// Label and price as shown in the order summary
    #[must_use]
    pub fn summary(self) -> OrderSummary {
        OrderSummary {
            item: self.label().to_string(),
            price: self.price().to_string(),
        }
    }
}

impl fmt::Display for CreditOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.price())
    }
}

impl FromStr for CreditOption {
    type Err = MonetizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "25" | "credits25" => Ok(Self::Credits25),
            "50" | "credits50" => Ok(Self::Credits50),
            "sub" | "subscription" => Ok(Self::Subscription),
            other => Err(MonetizationError::UnknownOption(other.to_string())),
        }
    }
}

/// Order summary shown in the credits dialog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderSummary {
    /// Line item
    pub item: String,
    /// Price text
    pub price: String,
}

/// Funnel position for the current turn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonetizationState {
    /// No upsell on screen
    #[default]
    Free,
    /// Answer shown with the upsell chip
    UpsellOffered,
    /// Ad overlay is up
    AdPending {
        /// Units left before skip is enabled; 0 means skip is available
        skip_in: u32,
    },
    /// Credits dialog is up
    CreditsPending {
        /// Currently selected package
        selection: CreditOption,
    },
    /// User declined; settles into `Free`
    DeclinedToFree,
    /// Premium content revealed for this turn
    Unlocked,
}

impl MonetizationState {
    /// Short name for logs and notices
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::UpsellOffered => "upsell_offered",
            Self::AdPending { .. } => "ad_pending",
            Self::CreditsPending { .. } => "credits_pending",
            Self::DeclinedToFree => "declined_to_free",
            Self::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for MonetizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What unlocked premium content
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnlockCause {
    /// User skipped the ad after the countdown
    AdSkipped,
    /// Ad ceiling elapsed
    AdCompleted,
    /// User confirmed a credit purchase
    CreditsPurchased,
}

/// Result of a successful machine step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// State changed
    Moved {
        /// Previous state
        from: MonetizationState,
        /// New state
        to: MonetizationState,
    },
    /// The machine reached `Unlocked`
    Unlocked(UnlockCause),
    /// Nothing changed (e.g. answer not premium-eligible)
    Stay,
}

/// Rejected machine actions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonetizationError {
    /// Action not valid in the current state
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// Attempted action
        action: &'static str,
        /// State at the time
        state: MonetizationState,
    },

    /// Skip pressed while the countdown is still running
    #[error("skip not available for {remaining} more")]
    SkipNotReady {
        /// Units left
        remaining: u32,
    },

    /// Unlock already happened this turn
    #[error("premium content already unlocked")]
    AlreadyUnlocked,

    /// Unparseable credit option
    #[error("unknown credit option: {0}")]
    UnknownOption(String),
}

/// The funnel state machine
#[derive(Clone, Debug)]
pub struct MonetizationMachine {
    state: MonetizationState,
    countdown_units: u32,
}

impl MonetizationMachine {
    /// New machine in `Free`; the ad skip unlocks after `countdown_units` ticks
    #[must_use]
    pub fn new(countdown_units: u32) -> Self {
        Self {
            state: MonetizationState::Free,
            countdown_units,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> MonetizationState {
        self.state
    }

    fn move_to(&mut self, to: MonetizationState) -> Transition {
        let from = self.state;
        self.state = to;
        tracing::debug!(from = %from, to = %to, "Monetization transition");
        Transition::Moved { from, to }
    }

    fn unlock(&mut self, cause: UnlockCause) -> Transition {
        let from = self.state;
        self.state = MonetizationState::Unlocked;
        tracing::info!(from = %from, cause = ?cause, "Premium content unlocked");
        Transition::Unlocked(cause)
    }

    fn invalid(&self, action: &'static str) -> MonetizationError {
        if self.state == MonetizationState::Unlocked {
            return MonetizationError::AlreadyUnlocked;
        }
        MonetizationError::InvalidTransition {
            action,
            state: self.state,
        }
    }

    /// A new turn begins; back to `Free` from anywhere
    pub fn start_turn(&mut self) -> Transition {
        if self.state == MonetizationState::Free {
            Transition::Stay
        } else {
            self.move_to(MonetizationState::Free)
        }
    }

    /// A turn's answer arrived
    ///
    /// Offers the upsell only for a premium-eligible answer on an unpaid session.
    pub fn on_answer(&mut self, premium_applicable: bool, paid: bool) -> Transition {
        if premium_applicable && !paid && self.state == MonetizationState::Free {
            self.move_to(MonetizationState::UpsellOffered)
        } else {
            Transition::Stay
        }
    }

    /// "Try now" on the chip; only valid while the upsell is offered
    pub fn open_upgrade_options(&self) -> Result<(), MonetizationError> {
        if self.state == MonetizationState::UpsellOffered {
            Ok(())
        } else {
            Err(self.invalid("open upgrade options"))
        }
    }

    /// "Watch an Ad"
    pub fn watch_ad(&mut self) -> Result<Transition, MonetizationError> {
        match self.state {
            MonetizationState::UpsellOffered => Ok(self.move_to(MonetizationState::AdPending {
                skip_in: self.countdown_units,
            })),
            _ => Err(self.invalid("watch ad")),
        }
    }

    /// One countdown unit elapsed
    ///
    /// Returns the remaining units, or `None` when the ad is no longer up.
    pub fn countdown_tick(&mut self) -> Option<u32> {
        match self.state {
            MonetizationState::AdPending { skip_in } => {
                let skip_in = skip_in.saturating_sub(1);
                self.state = MonetizationState::AdPending { skip_in };
                Some(skip_in)
            }
            _ => None,
        }
    }

    /// Skip pressed on the ad
    pub fn skip_ad(&mut self) -> Result<Transition, MonetizationError> {
        match self.state {
            MonetizationState::AdPending { skip_in: 0 } => Ok(self.unlock(UnlockCause::AdSkipped)),
            MonetizationState::AdPending { skip_in } => {
                Err(MonetizationError::SkipNotReady { remaining: skip_in })
            }
            _ => Err(self.invalid("skip ad")),
        }
    }

    /// Ad ceiling elapsed
    pub fn ad_ceiling(&mut self) -> Result<Transition, MonetizationError> {
        match self.state {
            MonetizationState::AdPending { .. } => Ok(self.unlock(UnlockCause::AdCompleted)),
            _ => Err(self.invalid("complete ad")),
        }
    }

    /// "Buy Credits"; opens the dialog with the default package selected
    pub fn buy_credits(&mut self) -> Result<Transition, MonetizationError> {
        match self.state {
            MonetizationState::UpsellOffered => Ok(self.move_to(MonetizationState::CreditsPending {
                selection: CreditOption::default(),
            })),
            _ => Err(self.invalid("buy credits")),
        }
    }

    /// Pick a package in the open dialog
    pub fn select_credits(&mut self, option: CreditOption) -> Result<Transition, MonetizationError> {
        match self.state {
            MonetizationState::CreditsPending { .. } => {
                Ok(self.move_to(MonetizationState::CreditsPending { selection: option }))
            }
            _ => Err(self.invalid("select credits")),
        }
    }

    /// "Buy" in the dialog
    pub fn confirm_purchase(&mut self) -> Result<(Transition, CreditOption), MonetizationError> {
        match self.state {
            MonetizationState::CreditsPending { selection } => {
                Ok((self.unlock(UnlockCause::CreditsPurchased), selection))
            }
            _ => Err(self.invalid("confirm purchase")),
        }
    }

    /// Close the dialog; back to the offer
    pub fn close_credits(&mut self) -> Result<Transition, MonetizationError> {
        match self.state {
            MonetizationState::CreditsPending { .. } => {
                Ok(self.move_to(MonetizationState::UpsellOffered))
            }
            _ => Err(self.invalid("close credits")),
        }
    }

    /// "No Thanks"
    pub fn continue_free(&mut self) -> Result<Transition, MonetizationError> {
        match self.state {
            MonetizationState::UpsellOffered => Ok(self.move_to(MonetizationState::DeclinedToFree)),
            _ => Err(self.invalid("continue free")),
        }
    }

    /// Settle a decline into `Free` once the fallback has been shown
    pub fn finish_decline(&mut self) -> Transition {
        if self.state == MonetizationState::DeclinedToFree {
            self.move_to(MonetizationState::Free)
        } else {
            Transition::Stay
        }
    }
}
