//! Telegram channel: Bot API update types and the outbound client (sendMessage, media sends,
//! getFile, file download, callback answers, webhook registration).

use crate::channels::transport::{check_status, TransportError};
use crate::config::TelegramCredentials;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Telegram chat id. Numeric for users and groups; respond.io may hand us a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Name(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{}", id),
            ChatId::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Id(id)
    }
}

/// Telegram update payload (webhook POST body).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    /// Only logged.
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Available sizes of the photo, smallest first.
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub video: Option<FileRef>,
    #[serde(default)]
    pub voice: Option<FileRef>,
    #[serde(default)]
    pub sticker: Option<FileRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Video, voice and sticker attachments; only the file id matters to the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

/// Inline keyboard button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// getFile result.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

/// getWebhookInfo result.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pending_update_count: u64,
    #[serde(default)]
    pub last_error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, TransportError> {
        if !self.ok {
            return Err(TransportError::Decode(format!(
                "{} returned ok: false ({})",
                method,
                self.description.unwrap_or_default()
            )));
        }
        self.result
            .ok_or_else(|| TransportError::Decode(format!("{} returned no result", method)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// Options merged into every send payload. Defaults to HTML parse mode and no keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            parse_mode: Some(ParseMode::Html),
            reply_markup: None,
        }
    }
}

impl SendOptions {
    pub fn with_keyboard(markup: InlineKeyboardMarkup) -> Self {
        Self {
            reply_markup: Some(markup),
            ..Self::default()
        }
    }
}

/// Media kinds Telegram can send by URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMedia {
    Photo,
    Document,
    Video,
    Audio,
}

impl ChatMedia {
    fn method(self) -> &'static str {
        match self {
            ChatMedia::Photo => "sendPhoto",
            ChatMedia::Document => "sendDocument",
            ChatMedia::Video => "sendVideo",
            ChatMedia::Audio => "sendAudio",
        }
    }

    fn field(self) -> &'static str {
        match self {
            ChatMedia::Photo => "photo",
            ChatMedia::Document => "document",
            ChatMedia::Video => "video",
            ChatMedia::Audio => "audio",
        }
    }
}

/// Outbound operations the translators need from the chat platform.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError>;

    /// Send a photo, document, video or audio file hosted at `url`.
    async fn send_media(
        &self,
        chat_id: &ChatId,
        media: ChatMedia,
        url: &str,
        caption: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError>;

    async fn get_file(&self, file_id: &str) -> Result<TelegramFile, TransportError>;

    async fn download_file(&self, file_path: &str) -> Result<Bytes, TransportError>;

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: &str,
    ) -> Result<(), TransportError>;
}

/// Telegram Bot API client for one bot token.
#[derive(Clone)]
pub struct TelegramClient {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, api_base: &str, token: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        }
    }

    /// Client with its own connection pool, for one-off commands.
    pub fn from_credentials(credentials: &TelegramCredentials) -> Self {
        Self::new(
            reqwest::Client::new(),
            &credentials.api_base,
            &credentials.bot_token,
        )
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn post_json(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<(), TransportError> {
        let res = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        check_status(res).await?;
        Ok(())
    }

    /// Send a photo by URL.
    pub async fn send_photo(
        &self,
        chat_id: &ChatId,
        url: &str,
        caption: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError> {
        ChatApi::send_media(self, chat_id, ChatMedia::Photo, url, caption, options).await
    }

    /// Send a document by URL.
    pub async fn send_document(
        &self,
        chat_id: &ChatId,
        url: &str,
        caption: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError> {
        ChatApi::send_media(self, chat_id, ChatMedia::Document, url, caption, options).await
    }

    /// Send a video by URL.
    pub async fn send_video(
        &self,
        chat_id: &ChatId,
        url: &str,
        caption: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError> {
        ChatApi::send_media(self, chat_id, ChatMedia::Video, url, caption, options).await
    }

    /// Send an audio file by URL.
    pub async fn send_audio(
        &self,
        chat_id: &ChatId,
        url: &str,
        caption: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError> {
        ChatApi::send_media(self, chat_id, ChatMedia::Audio, url, caption, options).await
    }

    /// Set webhook URL (and optional secret). Telegram then POSTs message and callback_query
    /// updates to it.
    pub async fn set_webhook(
        &self,
        url: &str,
        secret: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(s) = secret {
            body["secret_token"] = serde_json::Value::String(s.to_string());
        }
        let res = self
            .client
            .post(self.method_url("setWebhook"))
            .json(&body)
            .send()
            .await?;
        let data: ApiResponse<bool> = check_status(res).await?.json().await?;
        data.into_result("setWebhook")?;
        Ok(())
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo, TransportError> {
        let res = self
            .client
            .get(self.method_url("getWebhookInfo"))
            .send()
            .await?;
        let data: ApiResponse<WebhookInfo> = check_status(res).await?.json().await?;
        data.into_result("getWebhookInfo")
    }

    /// Remove the webhook.
    pub async fn delete_webhook(&self) -> Result<(), TransportError> {
        let res = self
            .client
            .post(self.method_url("deleteWebhook"))
            .send()
            .await?;
        let data: ApiResponse<bool> = check_status(res).await?.json().await?;
        data.into_result("deleteWebhook")?;
        Ok(())
    }
}

/// Merge the options bag into a JSON request body.
fn with_options(mut body: serde_json::Value, options: &SendOptions) -> serde_json::Value {
    if let Some(mode) = options.parse_mode {
        body["parse_mode"] = json!(mode);
    }
    if let Some(ref markup) = options.reply_markup {
        body["reply_markup"] = json!(markup);
    }
    body
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError> {
        let body = with_options(json!({ "chat_id": chat_id, "text": text }), options);
        self.post_json("sendMessage", &body).await
    }

    async fn send_media(
        &self,
        chat_id: &ChatId,
        media: ChatMedia,
        url: &str,
        caption: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "chat_id": chat_id, "caption": caption });
        body[media.field()] = serde_json::Value::String(url.to_string());
        let body = with_options(body, options);
        self.post_json(media.method(), &body).await
    }

    async fn get_file(&self, file_id: &str) -> Result<TelegramFile, TransportError> {
        let res = self
            .client
            .get(self.method_url("getFile"))
            .query(&[("file_id", file_id)])
            .send()
            .await?;
        let data: ApiResponse<TelegramFile> = check_status(res).await?.json().await?;
        data.into_result("getFile")
    }

    async fn download_file(&self, file_path: &str) -> Result<Bytes, TransportError> {
        let url = format!("{}/file/bot{}/{}", self.api_base, self.token, file_path);
        let res = self.client.get(&url).send().await?;
        Ok(check_status(res).await?.bytes().await?)
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: &str,
    ) -> Result<(), TransportError> {
        let body = json!({
            "callback_query_id": callback_query_id,
            "text": text,
            "show_alert": false,
        });
        self.post_json("answerCallbackQuery", &body).await
    }
}
