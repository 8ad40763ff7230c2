//! Platform transports: the Telegram Bot API and the respond.io API.
//!
//! Each client issues one HTTP call per operation and turns any non-2xx response into a
//! [`TransportError`]. The translators reach the clients through the [`ChatApi`] and
//! [`EngagementApi`] traits.

mod respond_io;
mod telegram;
mod transport;

pub use respond_io::{
    text_payload_candidates, AgentMessage, EngagementApi, EngagementMediaKind, RespondIoClient,
    WebhookEvent, WebhookMessage,
};
pub use telegram::{
    CallbackQuery, Chat, ChatApi, ChatId, ChatMedia, Document, FileRef, InlineKeyboardButton,
    InlineKeyboardMarkup, Message, ParseMode, PhotoSize, SendOptions, TelegramClient,
    TelegramFile, Update, User, WebhookInfo,
};
pub use transport::TransportError;
