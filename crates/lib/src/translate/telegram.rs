//! Telegram → respond.io: act on one classified update.

use crate::channels::{
    ChatApi, ChatId, EngagementApi, InlineKeyboardButton, InlineKeyboardMarkup, SendOptions,
    TransportError,
};
use crate::translate::canned;
use crate::translate::inbound::{ButtonChoice, InboundMedia, InboundUpdate, TelegramMediaKind};
use crate::translate::mime::mime_for_file_name;

/// File name used for the re-upload. Documents keep their own name when they have one.
pub fn media_file_name(kind: TelegramMediaKind, original: Option<&str>, now_ms: i64) -> String {
    match kind {
        TelegramMediaKind::Photo => format!("photo_{}.jpg", now_ms),
        TelegramMediaKind::Document => original
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("document_{}", now_ms)),
        TelegramMediaKind::Video => format!("video_{}.mp4", now_ms),
        TelegramMediaKind::Voice => format!("voice_{}.ogg", now_ms),
        TelegramMediaKind::Sticker => format!("sticker_{}.webp", now_ms),
    }
}

fn start_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton {
                text: canned::BUTTON_YES.to_string(),
                callback_data: canned::CALLBACK_YES.to_string(),
            },
            InlineKeyboardButton {
                text: canned::BUTTON_NO.to_string(),
                callback_data: canned::CALLBACK_NO.to_string(),
            },
        ]],
    }
}

/// Relays Telegram updates to respond.io for one request.
///
/// Failures of the forwarding step are answered with a canned Telegram message; only a
/// failure to deliver that canned message is returned as an error.
pub struct TelegramRelay<'a> {
    chat: &'a dyn ChatApi,
    engagement: &'a dyn EngagementApi,
    welcome_message: &'a str,
}

impl<'a> TelegramRelay<'a> {
    pub fn new(
        chat: &'a dyn ChatApi,
        engagement: &'a dyn EngagementApi,
        welcome_message: &'a str,
    ) -> Self {
        Self {
            chat,
            engagement,
            welcome_message,
        }
    }

    pub async fn handle(&self, update: InboundUpdate) -> Result<(), TransportError> {
        match update {
            InboundUpdate::Command { chat_id, command } => self.command(&chat_id, &command).await,
            InboundUpdate::Text {
                chat_id,
                user_id,
                text,
            } => self.text(&chat_id, &user_id, &text).await,
            InboundUpdate::Media {
                chat_id,
                user_id,
                media,
            } => self.media(&chat_id, &user_id, &media).await,
            InboundUpdate::ButtonPress {
                callback_id,
                chat_id,
                user_id,
                choice,
            } => self.button(&callback_id, &chat_id, &user_id, &choice).await,
            InboundUpdate::Ignored => {
                log::debug!("telegram update ignored");
                Ok(())
            }
        }
    }

    async fn command(&self, chat_id: &ChatId, command: &str) -> Result<(), TransportError> {
        if command != "/start" {
            log::debug!("ignoring command {:?} from chat {}", command, chat_id);
            return Ok(());
        }
        let options = SendOptions::with_keyboard(start_keyboard());
        match self
            .chat
            .send_message(chat_id, self.welcome_message, &options)
            .await
        {
            Ok(()) => {
                log::info!("welcome message with buttons sent to chat {}", chat_id);
                Ok(())
            }
            Err(e) => {
                log::error!("sending welcome message to chat {} failed: {}", chat_id, e);
                self.reply(chat_id, canned::START_FAILED).await
            }
        }
    }

    async fn text(
        &self,
        chat_id: &ChatId,
        user_id: &str,
        text: &str,
    ) -> Result<(), TransportError> {
        log::info!("forwarding text from user {} ({} chars)", user_id, text.chars().count());
        match self.engagement.send_text(user_id, text).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("forwarding text from user {} failed: {}", user_id, e);
                self.reply(chat_id, canned::text_failure_reply(&e)).await
            }
        }
    }

    async fn media(
        &self,
        chat_id: &ChatId,
        user_id: &str,
        media: &InboundMedia,
    ) -> Result<(), TransportError> {
        let kind = media.kind.engagement_kind();
        match self.forward_media(user_id, media).await {
            Ok(()) => {
                log::info!("{} from user {} forwarded to respond.io", kind.as_str(), user_id);
                Ok(())
            }
            Err(e) => {
                log::error!("forwarding {} from user {} failed: {}", kind.as_str(), user_id, e);
                self.reply(chat_id, &canned::media_failure_reply(kind)).await
            }
        }
    }

    /// getFile → download → upload → send, stopping at the first failure.
    async fn forward_media(
        &self,
        user_id: &str,
        media: &InboundMedia,
    ) -> Result<(), TransportError> {
        let file = self.chat.get_file(&media.file_id).await?;
        let file_path = file.file_path.ok_or_else(|| {
            TransportError::Decode(format!("getFile returned no file_path for {}", media.file_id))
        })?;
        let data = self.chat.download_file(&file_path).await?;

        let file_name = media_file_name(
            media.kind,
            media.file_name.as_deref(),
            chrono::Utc::now().timestamp_millis(),
        );
        let mime_type = mime_for_file_name(&file_name);
        log::debug!("uploading {} ({}, {} bytes)", file_name, mime_type, data.len());
        let url = self
            .engagement
            .upload_media(data, &file_name, mime_type)
            .await?;

        let caption = if media.kind.carries_caption() {
            media.caption.as_deref()
        } else {
            None
        };
        self.engagement
            .send_media(user_id, media.kind.engagement_kind(), &url, caption)
            .await
    }

    async fn button(
        &self,
        callback_id: &str,
        chat_id: &ChatId,
        user_id: &str,
        choice: &ButtonChoice,
    ) -> Result<(), TransportError> {
        match self.answer_button(callback_id, chat_id, user_id, choice).await {
            Ok(()) => {
                log::info!("button press {:?} handled for user {}", choice, user_id);
                Ok(())
            }
            Err(e) => {
                log::error!("handling button press from user {} failed: {}", user_id, e);
                self.chat
                    .answer_callback_query(callback_id, canned::BUTTON_FAILED)
                    .await
            }
        }
    }

    async fn answer_button(
        &self,
        callback_id: &str,
        chat_id: &ChatId,
        user_id: &str,
        choice: &ButtonChoice,
    ) -> Result<(), TransportError> {
        let reply = match choice {
            ButtonChoice::Yes => {
                self.engagement.send_text(user_id, canned::CHOSE_YES).await?;
                Some(canned::REPLY_YES)
            }
            ButtonChoice::No => {
                self.engagement.send_text(user_id, canned::CHOSE_NO).await?;
                Some(canned::REPLY_NO)
            }
            ButtonChoice::Other(data) => {
                log::warn!("unknown button data {:?} from user {}", data, user_id);
                None
            }
        };
        self.chat
            .answer_callback_query(callback_id, reply.unwrap_or(""))
            .await?;
        if let Some(text) = reply {
            self.reply(chat_id, text).await?;
        }
        Ok(())
    }

    async fn reply(&self, chat_id: &ChatId, text: &str) -> Result<(), TransportError> {
        self.chat
            .send_message(chat_id, text, &SendOptions::default())
            .await
    }
}
