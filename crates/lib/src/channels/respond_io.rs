//! respond.io channel: contact-message and media-upload client, plus the webhook event shapes
//! respond.io POSTs to us.

use crate::channels::telegram::ChatId;
use crate::channels::transport::{check_status, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Media kinds respond.io accepts in a contact message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementMediaKind {
    Photo,
    Document,
    Video,
    Audio,
    Sticker,
}

impl EngagementMediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngagementMediaKind::Photo => "photo",
            EngagementMediaKind::Document => "document",
            EngagementMediaKind::Video => "video",
            EngagementMediaKind::Audio => "audio",
            EngagementMediaKind::Sticker => "sticker",
        }
    }
}

/// Outbound operations the translators need from the engagement platform.
#[async_trait]
pub trait EngagementApi: Send + Sync {
    /// Forward a text message as the contact `user_id`.
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), TransportError>;

    async fn send_media(
        &self,
        user_id: &str,
        kind: EngagementMediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Upload a file and return the URL respond.io hosts it at.
    async fn upload_media(
        &self,
        data: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError>;
}

/// Text-message payloads in the order they are attempted.
///
/// respond.io has accepted different shapes over time; which one the current API expects is
/// unconfirmed. Drop the extra shapes once it is.
pub fn text_payload_candidates(
    channel_id: i64,
    user_id: &str,
    text: &str,
) -> Vec<serde_json::Value> {
    vec![
        json!({
            "channelId": channel_id,
            "contactId": user_id.parse::<i64>().ok(),
            "message": { "type": "text", "text": text }
        }),
        json!({
            "channelId": channel_id,
            "contact": { "id": user_id },
            "message": { "type": "text", "text": text }
        }),
        json!({
            "channelId": channel_id,
            "contactId": user_id,
            "type": "text",
            "text": text
        }),
    ]
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    url: Option<String>,
}

/// respond.io API client for one channel.
#[derive(Clone)]
pub struct RespondIoClient {
    base_url: String,
    api_token: String,
    channel_id: i64,
    client: reqwest::Client,
}

impl RespondIoClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_token: &str, channel_id: i64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            channel_id,
            client,
        }
    }

    /// POST /v2/contact/message with a prepared payload.
    async fn post_message(&self, payload: &serde_json::Value) -> Result<(), TransportError> {
        let url = format!("{}/v2/contact/message", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(payload)
            .send()
            .await?;
        check_status(res).await?;
        Ok(())
    }
}

#[async_trait]
impl EngagementApi for RespondIoClient {
    /// First payload shape that gets a 2xx wins; the last status failure is returned when none
    /// do. Network errors end the sequence immediately.
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        let candidates = text_payload_candidates(self.channel_id, user_id, text);
        let total = candidates.len();
        let mut last_err = None;
        for (i, payload) in candidates.iter().enumerate() {
            log::debug!("respond.io text attempt {}/{}: {}", i + 1, total, payload);
            match self.post_message(payload).await {
                Ok(()) => {
                    log::info!("text message sent to respond.io for user {}", user_id);
                    return Ok(());
                }
                Err(e @ TransportError::Status { .. }) => {
                    log::warn!("respond.io text attempt {}/{} failed: {}", i + 1, total, e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        let err = last_err
            .unwrap_or_else(|| TransportError::Decode("no text payload candidates".to_string()));
        log::error!(
            "all respond.io text payload shapes failed (channel {}, user {}): {}",
            self.channel_id,
            user_id,
            err
        );
        Err(err)
    }

    async fn send_media(
        &self,
        user_id: &str,
        kind: EngagementMediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut message = json!({ "type": kind, "url": url });
        if let Some(c) = caption.filter(|c| !c.is_empty()) {
            message["caption"] = serde_json::Value::String(c.to_string());
        }
        let payload = json!({
            "channelId": self.channel_id,
            "contactId": user_id,
            "message": message,
        });
        self.post_message(&payload).await?;
        log::info!("{} sent to respond.io for user {}", kind.as_str(), user_id);
        Ok(())
    }

    async fn upload_media(
        &self,
        data: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError> {
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let url = format!("{}/v2/media/upload", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = check_status(res).await?.json().await?;
        body.url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| TransportError::Decode("media upload response has no url".to_string()))
    }
}

/// Webhook body POSTed by respond.io.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub message: Option<WebhookMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Telegram user id the message is addressed to.
    #[serde(default)]
    pub contact_id: Option<ChatId>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// An agent reply, by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentMessage {
    Text { text: String },
    Image { url: String, caption: String },
    Document { url: String, caption: String },
    Video { url: String, caption: String },
    Audio { url: String, caption: String },
    Unsupported { kind: String, text: Option<String> },
}

impl WebhookMessage {
    pub fn to_agent_message(&self) -> AgentMessage {
        let url = || self.url.clone().unwrap_or_default();
        let caption = || self.caption.clone().unwrap_or_default();
        match self.kind.as_deref().unwrap_or("") {
            "text" => AgentMessage::Text {
                text: self.text.clone().unwrap_or_default(),
            },
            "image" => AgentMessage::Image {
                url: url(),
                caption: caption(),
            },
            "document" => AgentMessage::Document {
                url: url(),
                caption: caption(),
            },
            "video" => AgentMessage::Video {
                url: url(),
                caption: caption(),
            },
            "audio" => AgentMessage::Audio {
                url: url(),
                caption: caption(),
            },
            other => AgentMessage::Unsupported {
                kind: other.to_string(),
                text: self.text.clone(),
            },
        }
    }
}
