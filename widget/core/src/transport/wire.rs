//! Wire Formats
//!
//! JSON shapes exchanged with the backend, and their conversion into the
//! widget's own types.

use serde::{Deserialize, Serialize};

use crate::events::{StatusEvent, StatusStage};
use crate::messages::{ClientId, Message};
use crate::payload::{PdfDocument, PremiumPayload, VideoRef};

use super::{ChannelError, ChatReply};

/// `POST /chat` request body
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    /// Submitted text
    pub message: &'a str,
    /// Full conversation log, user entry for `message` included
    #[serde(rename = "chatHistory")]
    pub chat_history: &'a [Message],
    /// Session identity
    #[serde(rename = "clientId")]
    pub client_id: &'a ClientId,
}

/// `POST /chat` response body
#[derive(Debug, Deserialize)]
pub struct ChatResponseBody {
    /// Answer text
    pub gemini_response: String,
    /// Premium eligibility for this turn
    #[serde(default)]
    pub premium_applicable: bool,
}

impl From<ChatResponseBody> for ChatReply {
    fn from(body: ChatResponseBody) -> Self {
        Self {
            answer_text: body.gemini_response,
            premium_applicable: body.premium_applicable,
        }
    }
}

/// `data` object of a `completed` push
///
/// Videos arrive as parallel arrays indexed by `video_file_links`.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletedData {
    /// Premium answer text
    pub gemini_response: String,
    /// Video URLs
    pub video_file_links: Vec<String>,
    /// Video display names
    pub video_file_names: Vec<String>,
    /// Video thumbnails
    pub thumbnail_links: Vec<String>,
    /// Video partner names
    pub partner_names: Vec<String>,
    /// Matching documents
    pub pdf_documents: Vec<PdfDocument>,
}

impl From<CompletedData> for PremiumPayload {
    fn from(data: CompletedData) -> Self {
        let at = |list: &[String], i: usize| list.get(i).cloned().unwrap_or_default();
        let video_refs = data
            .video_file_links
            .iter()
            .enumerate()
            .map(|(i, link)| VideoRef {
                link: link.clone(),
                display_name: at(&data.video_file_names, i),
                thumbnail_link: at(&data.thumbnail_links, i),
                partner_name: at(&data.partner_names, i),
            })
            .collect();

        Self {
            answer_text: data.gemini_response,
            video_refs,
            pdf_documents: data.pdf_documents,
        }
    }
}

/// One status push as it appears on the wire
#[derive(Debug, Deserialize, Serialize)]
pub struct StatusFrame {
    /// `started`, `searching`, `searching_videos`, `synthesizing`, `completed` or `error`
    pub status: String,
    /// Human-readable text for progress and error pushes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload for `completed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CompletedData>,
}

impl StatusFrame {
    /// Convert into a [`StatusEvent`]
    pub fn into_event(self) -> Result<StatusEvent, ChannelError> {
        let message = self.message.unwrap_or_default();
        let progress = |stage| StatusEvent::Progress {
            stage,
            message: message.clone(),
        };
        match self.status.as_str() {
            "started" => Ok(StatusEvent::Started),
            "searching" => Ok(progress(StatusStage::Searching)),
            "searching_videos" => Ok(progress(StatusStage::SearchingVideos)),
            "synthesizing" => Ok(progress(StatusStage::Synthesizing)),
            "completed" => {
                let data = self.data.ok_or(ChannelError::MissingPayload)?;
                Ok(StatusEvent::Completed {
                    payload: data.into(),
                })
            }
            "error" => Ok(StatusEvent::Error {
                message: message.clone(),
            }),
            other => Err(ChannelError::UnknownStatus(other.to_string())),
        }
    }
}

/// Decode a raw text frame
pub fn decode_status(raw: &str) -> Result<StatusEvent, ChannelError> {
    let frame: StatusFrame =
        serde_json::from_str(raw).map_err(|e| ChannelError::Decode(e.to_string()))?;
    frame.into_event()
}

/// Encode a status event as a wire frame (used by the scripted connector)
#[must_use]
pub fn encode_status(event: &StatusEvent) -> String {
    let (status, message, data) = match event {
        StatusEvent::Started => ("started", None, None),
        StatusEvent::Progress { stage, message } => {
            let status = match stage {
                StatusStage::Searching => "searching",
                StatusStage::SearchingVideos => "searching_videos",
                StatusStage::Synthesizing => "synthesizing",
            };
            (status, Some(message.clone()), None)
        }
        StatusEvent::Completed { payload } => {
            let data = CompletedData {
                gemini_response: payload.answer_text.clone(),
                video_file_links: payload.video_refs.iter().map(|v| v.link.clone()).collect(),
                video_file_names: payload
                    .video_refs
                    .iter()
                    .map(|v| v.display_name.clone())
                    .collect(),
                thumbnail_links: payload
                    .video_refs
                    .iter()
                    .map(|v| v.thumbnail_link.clone())
                    .collect(),
                partner_names: payload
                    .video_refs
                    .iter()
                    .map(|v| v.partner_name.clone())
                    .collect(),
                pdf_documents: payload.pdf_documents.clone(),
            };
            ("completed", None, Some(data))
        }
        StatusEvent::Error { message } => ("error", Some(message.clone()), None),
    };
    let frame = StatusFrame {
        status: status.to_string(),
        message,
        data,
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chat_request_keys() {
        let history = vec![Message::user("hello")];
        let client_id = ClientId::from_string("client_abc");
        let body = ChatRequest {
            message: "hello",
            chat_history: &history,
            client_id: &client_id,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "hello",
                "chatHistory": [{"role": "user", "content": "hello", "isPremium": false}],
                "clientId": "client_abc"
            })
        );
    }

    #[test]
    fn test_chat_response_decodes() {
        let body: ChatResponseBody =
            serde_json::from_str(r#"{"gemini_response":"hi there","premium_applicable":true}"#)
                .unwrap();
        let reply = ChatReply::from(body);
        assert_eq!(reply.answer_text, "hi there");
        assert!(reply.premium_applicable);
    }

    #[test]
    fn test_progress_frame() {
        let event =
            decode_status(r#"{"status":"searching_videos","message":"Looking at videos"}"#).unwrap();
        assert_eq!(
            event,
            StatusEvent::Progress {
                stage: StatusStage::SearchingVideos,
                message: "Looking at videos".into()
            }
        );
    }

    #[test]
    fn test_completed_zips_videos_with_defaults() {
        let raw = r#"{
            "status": "completed",
            "data": {
                "gemini_response": "premium",
                "video_file_links": ["https://v/1", "https://v/2"],
                "video_file_names": ["One"],
                "thumbnail_links": ["https://t/1", "https://t/2"],
                "partner_names": ["Acme", "Globex"],
                "pdf_documents": [{"link": "https://d/a.pdf", "title": "A", "snippets": [], "page_number": 2, "link_with_page": "https://d/a.pdf#page=2"}]
            }
        }"#;
        let StatusEvent::Completed { payload } = decode_status(raw).unwrap() else {
            panic!("expected completed");
        };
        assert_eq!(payload.video_refs.len(), 2);
        assert_eq!(payload.video_refs[1].display_name, "");
        assert_eq!(payload.video_refs[1].partner_name, "Globex");
        assert_eq!(payload.pdf_documents[0].page_number, 2);
    }

    #[test]
    fn test_completed_without_data_is_error() {
        assert!(matches!(
            decode_status(r#"{"status":"completed"}"#),
            Err(ChannelError::MissingPayload)
        ));
    }

    #[test]
    fn test_unknown_status_and_garbage() {
        assert!(matches!(
            decode_status(r#"{"status":"dancing"}"#),
            Err(ChannelError::UnknownStatus(_))
        ));
        assert!(matches!(decode_status("not json"), Err(ChannelError::Decode(_))));
    }

    #[test]
    fn test_encode_completed_decodes_back() {
        let payload = PremiumPayload {
            answer_text: "premium".into(),
            video_refs: vec![VideoRef {
                link: "https://v/1".into(),
                display_name: "One".into(),
                thumbnail_link: "https://t/1".into(),
                partner_name: "Acme".into(),
            }],
            pdf_documents: vec![],
        };
        let raw = encode_status(&StatusEvent::Completed {
            payload: payload.clone(),
        });
        assert_eq!(decode_status(&raw).unwrap(), StatusEvent::Completed { payload });
    }
}
