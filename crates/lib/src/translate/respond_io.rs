//! respond.io → Telegram: deliver an agent message to the user it is addressed to.

use crate::channels::{AgentMessage, ChatApi, ChatMedia, SendOptions, WebhookEvent};
use crate::error::RelayError;
use crate::translate::canned;

/// What happened to a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Not a message event; nothing was sent.
    Ignored,
}

pub async fn relay_event(event: WebhookEvent, chat: &dyn ChatApi) -> Result<Delivery, RelayError> {
    let message = match (event.event.as_deref(), event.message) {
        (Some("message"), Some(message)) => message,
        (kind, _) => {
            log::info!("ignoring non-message respond.io event: {:?}", kind);
            return Ok(Delivery::Ignored);
        }
    };
    let chat_id = message
        .contact_id
        .clone()
        .ok_or_else(|| RelayError::Invalid("message has no contactId".to_string()))?;
    let options = SendOptions::default();
    let agent_message = message.to_agent_message();
    log::info!("delivering respond.io message to telegram chat {}: {:?}", chat_id, agent_message);

    match agent_message {
        AgentMessage::Text { text } => chat.send_message(&chat_id, &text, &options).await?,
        AgentMessage::Image { url, caption } => {
            chat.send_media(&chat_id, ChatMedia::Photo, &url, &caption, &options)
                .await?
        }
        AgentMessage::Document { url, caption } => {
            chat.send_media(&chat_id, ChatMedia::Document, &url, &caption, &options)
                .await?
        }
        AgentMessage::Video { url, caption } => {
            chat.send_media(&chat_id, ChatMedia::Video, &url, &caption, &options)
                .await?
        }
        AgentMessage::Audio { url, caption } => {
            chat.send_media(&chat_id, ChatMedia::Audio, &url, &caption, &options)
                .await?
        }
        AgentMessage::Unsupported { kind, text } => {
            log::warn!("unsupported respond.io message type {:?}, sending as text", kind);
            let text = text
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| canned::AGENT_PLACEHOLDER.to_string());
            chat.send_message(&chat_id, &text, &options).await?
        }
    }
    Ok(Delivery::Delivered)
}
