//! Render Dispatcher
//!
//! Decides which UI fragment the surface should draw. Planning is pure
//! ([`plan`]); materializing a plan ([`render`]) is the only step that
//! touches session state, because premium cards are handed out once.

use crate::events::StatusEvent;
use crate::messages::MessageRole;
use crate::monetization::{CreditOption, MonetizationState, OrderSummary};
use crate::payload::{PdfDocument, VideoRef};
use crate::session::SessionState;

/// Text on the upsell chip
pub const UPSELL_CHIP_TEXT: &str = "Get Premium Answer with DataSense Partner Data";

/// Toast shown after a confirmed purchase
pub const PURCHASE_TOAST_TEXT: &str = "Transaction charged to Google Account";

/// Premium answer with its partner cards, in received order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PremiumCards {
    /// Premium answer text
    pub answer_text: String,
    /// Video cards
    pub videos: Vec<VideoRef>,
    /// Document cards
    pub documents: Vec<PdfDocument>,
}

impl PremiumCards {
    /// Number of cards (videos plus documents)
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.videos.len() + self.documents.len()
    }
}

/// Something the surface should draw
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    /// Echo of the user's submission
    UserMessage {
        /// Submitted text
        text: String,
    },
    /// Assistant answer without an upsell
    PlainAnswer {
        /// Answer text
        text: String,
    },
    /// Assistant answer with the upsell chip
    AnswerWithUpsell {
        /// Answer text
        text: String,
        /// Chip label
        chip: String,
    },
    /// Progress of the premium request
    StatusLine {
        /// Status text
        text: String,
    },
    /// Revealed premium content
    PremiumCards(PremiumCards),
    /// Watch-ad / buy-credits / no-thanks choices
    UpgradeModal,
    /// Ad is playing
    AdOverlay {
        /// Units until skip is enabled; 0 means skip is available
        skip_in: u32,
    },
    /// Credits purchase dialog
    CreditsDialog {
        /// Selected package
        selection: CreditOption,
        /// Order summary for the selection
        summary: OrderSummary,
    },
    /// Close whatever overlay is up
    DismissOverlay,
    /// Short-lived confirmation
    Toast {
        /// Toast text
        text: String,
    },
}

/// What [`plan`] decided, before any state is consumed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderPlan {
    /// Nothing to draw
    Nothing,
    /// The latest assistant answer
    Answer {
        /// Answer text
        text: String,
        /// Whether to attach the upsell chip
        upsell: bool,
    },
    /// A status line
    StatusLine(String),
    /// Flush the unrevealed premium payload
    PremiumCards,
    /// Ad overlay
    AdOverlay {
        /// Units until skip
        skip_in: u32,
    },
    /// Credits dialog
    CreditsDialog {
        /// Selected package
        selection: CreditOption,
    },
}

/// Pure planning from state
///
/// With a status event: unpaid sessions draw nothing, a completed event with
/// an unrevealed payload flushes the cards, anything else is a status line.
/// Without one, the monetization state decides.
#[must_use]
pub fn plan(
    session: &SessionState,
    state: MonetizationState,
    status: Option<&StatusEvent>,
) -> RenderPlan {
    if let Some(event) = status {
        if !session.is_paid() {
            return RenderPlan::Nothing;
        }
        if matches!(event, StatusEvent::Completed { .. }) && session.has_unrevealed_payload() {
            return RenderPlan::PremiumCards;
        }
        return RenderPlan::StatusLine(event.status_text());
    }

    match state {
        MonetizationState::Free | MonetizationState::DeclinedToFree => answer_plan(session, false),
        MonetizationState::UpsellOffered => answer_plan(session, true),
        MonetizationState::AdPending { skip_in } => RenderPlan::AdOverlay { skip_in },
        MonetizationState::CreditsPending { selection } => RenderPlan::CreditsDialog { selection },
        MonetizationState::Unlocked => {
            if session.has_unrevealed_payload() {
                RenderPlan::PremiumCards
            } else if let Some(text) = session.pending_status_text() {
                RenderPlan::StatusLine(text.to_string())
            } else {
                RenderPlan::Nothing
            }
        }
    }
}

fn answer_plan(session: &SessionState, upsell: bool) -> RenderPlan {
    match session.log().last() {
        Some(last) if last.role == MessageRole::Assistant => RenderPlan::Answer {
            text: last.content.clone(),
            upsell,
        },
        _ => RenderPlan::Nothing,
    }
}

/// Plan and materialize a fragment
///
/// Flushing premium cards drains the stored payload, so a second call with
/// the same payload yields nothing.
pub fn render(
    session: &mut SessionState,
    state: MonetizationState,
    status: Option<&StatusEvent>,
) -> Option<Fragment> {
    match plan(session, state, status) {
        RenderPlan::Nothing => None,
        RenderPlan::Answer { text, upsell: false } => Some(Fragment::PlainAnswer { text }),
        RenderPlan::Answer { text, upsell: true } => Some(Fragment::AnswerWithUpsell {
            text,
            chip: UPSELL_CHIP_TEXT.to_string(),
        }),
        RenderPlan::StatusLine(text) => Some(Fragment::StatusLine { text }),
        RenderPlan::PremiumCards => flush_premium(session),
        RenderPlan::AdOverlay { skip_in } => Some(Fragment::AdOverlay { skip_in }),
        RenderPlan::CreditsDialog { selection } => Some(Fragment::CreditsDialog {
            selection,
            summary: selection.summary(),
        }),
    }
}

/// Flush the unrevealed payload as a cards fragment
pub fn flush_premium(session: &mut SessionState) -> Option<Fragment> {
    let cards = session.take_premium_cards()?;
    tracing::debug!(
        videos = cards.videos.len(),
        documents = cards.documents.len(),
        "Flushing premium cards"
    );
    Some(Fragment::PremiumCards(cards))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ClientId;
    use crate::payload::PremiumPayload;
    use pretty_assertions::assert_eq;

    fn session_with_answer() -> SessionState {
        let mut session = SessionState::new(ClientId::new());
        session.push_user("hello");
        session.push_assistant("hi there", true);
        session
    }

    fn completed(docs: usize) -> (PremiumPayload, StatusEvent) {
        let payload = PremiumPayload {
            answer_text: "premium".into(),
            video_refs: vec![],
            pdf_documents: (0..docs)
                .map(|i| PdfDocument {
                    title: format!("Doc {i}"),
                    ..Default::default()
                })
                .collect(),
        };
        let event = StatusEvent::Completed {
            payload: payload.clone(),
        };
        (payload, event)
    }

    #[test]
    fn test_upsell_state_plans_chip() {
        let session = session_with_answer();
        assert_eq!(
            plan(&session, MonetizationState::UpsellOffered, None),
            RenderPlan::Answer {
                text: "hi there".into(),
                upsell: true
            }
        );
    }

    #[test]
    fn test_free_state_plans_plain_answer() {
        let mut session = session_with_answer();
        let fragment = render(&mut session, MonetizationState::Free, None);
        assert_eq!(
            fragment,
            Some(Fragment::PlainAnswer {
                text: "hi there".into()
            })
        );
    }

    #[test]
    fn test_status_hidden_until_paid() {
        let session = session_with_answer();
        assert_eq!(
            plan(&session, MonetizationState::Free, Some(&StatusEvent::Started)),
            RenderPlan::Nothing
        );
    }

    #[test]
    fn test_status_line_when_paid() {
        let mut session = session_with_answer();
        session.mark_paid();
        assert_eq!(
            plan(&session, MonetizationState::Free, Some(&StatusEvent::Started)),
            RenderPlan::StatusLine("Premium response generation started".into())
        );
    }

    #[test]
    fn test_completed_flushes_cards_once() {
        let mut session = session_with_answer();
        session.mark_paid();
        let (payload, event) = completed(3);
        session.store_payload(payload);

        let first = render(&mut session, MonetizationState::Free, Some(&event));
        match first {
            Some(Fragment::PremiumCards(cards)) => assert_eq!(cards.documents.len(), 3),
            other => panic!("expected cards, got {other:?}"),
        }

        let second = render(&mut session, MonetizationState::Free, Some(&event));
        assert_eq!(
            second,
            Some(Fragment::StatusLine {
                text: "Premium response completed".into()
            })
        );
        assert!(flush_premium(&mut session).is_none());
    }

    #[test]
    fn test_unlocked_without_payload_shows_status() {
        let mut session = session_with_answer();
        session.set_status_text(Some("Synthesizing...".into()));
        assert_eq!(
            plan(&session, MonetizationState::Unlocked, None),
            RenderPlan::StatusLine("Synthesizing...".into())
        );
    }

    #[test]
    fn test_credits_dialog_carries_summary() {
        let mut session = session_with_answer();
        let fragment = render(
            &mut session,
            MonetizationState::CreditsPending {
                selection: CreditOption::Credits50,
            },
            None,
        );
        assert_eq!(
            fragment,
            Some(Fragment::CreditsDialog {
                selection: CreditOption::Credits50,
                summary: CreditOption::Credits50.summary(),
            })
        );
    }
}
