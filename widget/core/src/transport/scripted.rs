//! Scripted Transports
//!
//! Canned chat replies and a canned status channel, for demo mode and tests.
//! A [`ScriptedBackend`] wires the two together: premium turns answered by its
//! transport push `started → searching → searching_videos → synthesizing →
//! completed` onto its status channel.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;

use super::wire::encode_status;
use super::{ChannelError, ChatReply, ChatTransport, StatusConnector, StatusStream, TransportError};
use crate::events::{StatusEvent, StatusStage};
use crate::messages::{ClientId, Message};
use crate::payload::{PdfDocument, PremiumPayload, VideoRef};

const CHANNEL_CAPACITY: usize = 64;

/// One canned chat outcome
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    /// Successful answer, optionally followed by a premium payload on the status channel
    Answer {
        /// Answer text
        text: String,
        /// Premium eligibility
        premium_applicable: bool,
        /// Payload pushed after the answer when premium
        payload: Option<PremiumPayload>,
    },
    /// Non-success HTTP status
    Fail {
        /// Status code
        status: u16,
    },
}

impl ScriptedReply {
    /// Plain answer with no premium follow-up
    pub fn answer(text: impl Into<String>, premium_applicable: bool) -> Self {
        Self::Answer {
            text: text.into(),
            premium_applicable,
            payload: None,
        }
    }

    /// Premium answer followed by `payload`
    pub fn premium(text: impl Into<String>, payload: PremiumPayload) -> Self {
        Self::Answer {
            text: text.into(),
            premium_applicable: true,
            payload: Some(payload),
        }
    }
}

/// A chat call the scripted transport received
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Submitted text
    pub text: String,
    /// Conversation log length at call time
    pub history_len: usize,
    /// Client identity sent
    pub client_id: ClientId,
}

/// Canned chat transport
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    demo: bool,
    requests: Mutex<Vec<RecordedRequest>>,
    status: Option<broadcast::Sender<String>>,
    stage_delay: Duration,
    pending_push: Mutex<Option<JoinHandle<()>>>,
}

impl ScriptedTransport {
    /// Answer with `replies` in order, then with an error once they run out
    #[must_use]
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self::build(replies, false, None, Duration::ZERO)
    }

    /// Generate demo answers for any input
    #[must_use]
    pub fn demo() -> Self {
        Self::build(Vec::new(), true, None, Duration::ZERO)
    }

    fn build(
        replies: Vec<ScriptedReply>,
        demo: bool,
        status: Option<broadcast::Sender<String>>,
        stage_delay: Duration,
    ) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            demo,
            requests: Mutex::new(Vec::new()),
            status,
            stage_delay,
            pending_push: Mutex::new(None),
        }
    }

    /// Calls received so far
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn next_reply(&self, text: &str) -> ScriptedReply {
        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }
        if self.demo {
            return demo_reply(text);
        }
        ScriptedReply::Fail { status: 500 }
    }

    fn push_premium_sequence(&self, payload: PremiumPayload) {
        let Some(frames) = self.status.clone() else {
            return;
        };
        let delay = self.stage_delay;
        let sequence = premium_sequence(payload);
        let task = tokio::spawn(async move {
            for event in sequence {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _ = frames.send(encode_status(&event));
            }
        });
        if let Some(previous) = self.pending_push.lock().replace(task) {
            previous.abort();
        }
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        if let Some(task) = self.pending_push.lock().take() {
            task.abort();
        }
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send_message(
        &self,
        text: &str,
        history: &[Message],
        client_id: &ClientId,
    ) -> Result<ChatReply, TransportError> {
        self.requests.lock().push(RecordedRequest {
            text: text.to_string(),
            history_len: history.len(),
            client_id: client_id.clone(),
        });

        match self.next_reply(text) {
            ScriptedReply::Answer {
                text,
                premium_applicable,
                payload,
            } => {
                if let Some(payload) = payload {
                    self.push_premium_sequence(payload);
                }
                Ok(ChatReply {
                    answer_text: text,
                    premium_applicable,
                })
            }
            ScriptedReply::Fail { status } => Err(TransportError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
        }
    }
}

/// Canned status channel fed by a [`ScriptedBackend`]
#[derive(Clone)]
pub struct ScriptedStatusConnector {
    frames: broadcast::Sender<String>,
}

#[async_trait]
impl StatusConnector for ScriptedStatusConnector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn connect(&self, client_id: &ClientId) -> Result<StatusStream, ChannelError> {
        tracing::debug!(client_id = %client_id, "Scripted status channel connected");
        let frames = BroadcastStream::new(self.frames.subscribe()).filter_map(|frame| async move {
            match frame {
                Ok(raw) => Some(Ok(raw)),
                Err(e) => {
                    tracing::warn!(error = %e, "Scripted status channel lagged");
                    None
                }
            }
        });
        Ok(frames.boxed())
    }
}

/// A scripted transport and status connector sharing one channel
pub struct ScriptedBackend {
    frames: broadcast::Sender<String>,
    stage_delay: Duration,
}

impl ScriptedBackend {
    /// Backend whose premium sequences are spaced `stage_delay` apart
    #[must_use]
    pub fn new(stage_delay: Duration) -> Self {
        let (frames, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            frames,
            stage_delay,
        }
    }

    /// Transport answering with `replies`
    #[must_use]
    pub fn transport(&self, replies: Vec<ScriptedReply>) -> ScriptedTransport {
        ScriptedTransport::build(
            replies,
            false,
            Some(self.frames.clone()),
            self.stage_delay,
        )
    }

    /// Transport generating demo answers
    #[must_use]
    pub fn demo_transport(&self) -> ScriptedTransport {
        ScriptedTransport::build(
            Vec::new(),
            true,
            Some(self.frames.clone()),
            self.stage_delay,
        )
    }

    /// Status connector on this backend's channel
    #[must_use]
    pub fn connector(&self) -> ScriptedStatusConnector {
        ScriptedStatusConnector {
            frames: self.frames.clone(),
        }
    }

    /// Push one status event to every open channel
    ///
    /// Returns how many channels received it.
    pub fn push(&self, event: &StatusEvent) -> usize {
        self.frames.send(encode_status(event)).unwrap_or(0)
    }

    /// Push a raw frame (for malformed-frame handling)
    pub fn push_raw(&self, raw: impl Into<String>) -> usize {
        self.frames.send(raw.into()).unwrap_or(0)
    }
}

fn premium_sequence(payload: PremiumPayload) -> Vec<StatusEvent> {
    vec![
        StatusEvent::Started,
        StatusEvent::Progress {
            stage: StatusStage::Searching,
            message: "Searching partner documents...".to_string(),
        },
        StatusEvent::Progress {
            stage: StatusStage::SearchingVideos,
            message: "Searching partner videos...".to_string(),
        },
        StatusEvent::Progress {
            stage: StatusStage::Synthesizing,
            message: "Synthesizing premium answer...".to_string(),
        },
        StatusEvent::Completed { payload },
    ]
}

fn demo_reply(text: &str) -> ScriptedReply {
    let trimmed = text.trim();
    let answer = if trimmed.eq_ignore_ascii_case("hello") || trimmed.eq_ignore_ascii_case("hi") {
        "hi there".to_string()
    } else {
        format!("Here is what public sources say about \"{trimmed}\".")
    };
    ScriptedReply::premium(answer, demo_payload(trimmed))
}

/// Sample payload used by demo mode
#[must_use]
pub fn demo_payload(topic: &str) -> PremiumPayload {
    PremiumPayload {
        answer_text: format!("Partner data adds detail on \"{topic}\" from verified sources."),
        video_refs: vec![VideoRef {
            link: "https://partners.example.com/videos/overview.mp4".to_string(),
            display_name: "overview.mp4".to_string(),
            thumbnail_link: "https://partners.example.com/thumbs/overview.jpg".to_string(),
            partner_name: "Acme Media".to_string(),
        }],
        pdf_documents: vec![
            PdfDocument {
                link: "https://partners.example.com/docs/guide.pdf".to_string(),
                title: "Field Guide".to_string(),
                snippets: vec![format!("Section 2 covers {topic} in depth.")],
                page_number: 3,
                link_with_page: "https://partners.example.com/docs/guide.pdf#page=3".to_string(),
            },
            PdfDocument {
                link: "https://partners.example.com/docs/faq.pdf".to_string(),
                title: "FAQ".to_string(),
                snippets: Vec::new(),
                page_number: 1,
                link_with_page: "https://partners.example.com/docs/faq.pdf#page=1".to_string(),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::wire::decode_status;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_replies_in_order_then_fail() {
        let transport = ScriptedTransport::new(vec![ScriptedReply::answer("hi there", true)]);
        let id = ClientId::from_string("c");

        let reply = transport.send_message("hello", &[], &id).await.unwrap();
        assert_eq!(reply.answer_text, "hi there");
        assert!(reply.premium_applicable);

        let err = transport.send_message("again", &[], &id).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_demo_greets() {
        let transport = ScriptedTransport::demo();
        let reply = transport
            .send_message("hello", &[], &ClientId::new())
            .await
            .unwrap();
        assert_eq!(reply.answer_text, "hi there");
    }

    #[tokio::test]
    async fn test_backend_pushes_premium_sequence() {
        let backend = ScriptedBackend::new(Duration::ZERO);
        let connector = backend.connector();
        let mut stream = connector.connect(&ClientId::new()).await.unwrap();

        let payload = demo_payload("tides");
        let transport = backend.transport(vec![ScriptedReply::premium("ok", payload.clone())]);
        transport
            .send_message("tides", &[], &ClientId::new())
            .await
            .unwrap();

        let mut kinds = Vec::new();
        for _ in 0..5 {
            let raw = stream.next().await.unwrap().unwrap();
            kinds.push(decode_status(&raw).unwrap().kind());
        }
        assert_eq!(
            kinds,
            vec!["started", "progress", "progress", "progress", "completed"]
        );
    }
}
