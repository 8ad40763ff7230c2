//! Classify a raw Telegram update into the one thing the relay should do with it.

use crate::channels::{ChatId, EngagementMediaKind, Message, Update};

/// Telegram attachment kinds the relay forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramMediaKind {
    Photo,
    Document,
    Video,
    Voice,
    Sticker,
}

impl TelegramMediaKind {
    /// Kind used on the respond.io side. Voice notes become generic audio.
    pub fn engagement_kind(self) -> EngagementMediaKind {
        match self {
            TelegramMediaKind::Photo => EngagementMediaKind::Photo,
            TelegramMediaKind::Document => EngagementMediaKind::Document,
            TelegramMediaKind::Video => EngagementMediaKind::Video,
            TelegramMediaKind::Voice => EngagementMediaKind::Audio,
            TelegramMediaKind::Sticker => EngagementMediaKind::Sticker,
        }
    }

    /// Whether the user's caption is forwarded with this kind.
    pub fn carries_caption(self) -> bool {
        matches!(
            self,
            TelegramMediaKind::Photo | TelegramMediaKind::Document | TelegramMediaKind::Video
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMedia {
    pub kind: TelegramMediaKind,
    pub file_id: String,
    /// Original file name; only documents have one.
    pub file_name: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonChoice {
    Yes,
    No,
    Other(String),
}

impl ButtonChoice {
    fn from_data(data: &str) -> Self {
        match data {
            "yes" => ButtonChoice::Yes,
            "no" => ButtonChoice::No,
            other => ButtonChoice::Other(other.to_string()),
        }
    }
}

/// One Telegram update, reduced to what the relay acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUpdate {
    /// Text starting with `/`.
    Command { chat_id: ChatId, command: String },
    Text {
        chat_id: ChatId,
        user_id: String,
        text: String,
    },
    Media {
        chat_id: ChatId,
        user_id: String,
        media: InboundMedia,
    },
    ButtonPress {
        callback_id: String,
        chat_id: ChatId,
        user_id: String,
        choice: ButtonChoice,
    },
    Ignored,
}

/// Sender id as a string; falls back to the chat id when `from` is absent.
fn sender_id(message: &Message) -> String {
    message
        .from
        .as_ref()
        .map(|u| u.id)
        .unwrap_or(message.chat.id)
        .to_string()
}

fn media_of(message: &Message) -> Option<InboundMedia> {
    let caption = message.caption.clone();
    if let Some(largest) = message.photo.as_ref().and_then(|sizes| sizes.last()) {
        return Some(InboundMedia {
            kind: TelegramMediaKind::Photo,
            file_id: largest.file_id.clone(),
            file_name: None,
            caption,
        });
    }
    if let Some(ref doc) = message.document {
        return Some(InboundMedia {
            kind: TelegramMediaKind::Document,
            file_id: doc.file_id.clone(),
            file_name: doc.file_name.clone(),
            caption,
        });
    }
    let (kind, file) = if let Some(ref v) = message.video {
        (TelegramMediaKind::Video, v)
    } else if let Some(ref v) = message.voice {
        (TelegramMediaKind::Voice, v)
    } else if let Some(ref s) = message.sticker {
        (TelegramMediaKind::Sticker, s)
    } else {
        return None;
    };
    Some(InboundMedia {
        kind,
        file_id: file.file_id.clone(),
        file_name: None,
        caption: if kind.carries_caption() { caption } else { None },
    })
}

/// Button presses win over messages; commands over plain text; text over attachments.
pub fn classify(update: Update) -> InboundUpdate {
    if let Some(cq) = update.callback_query {
        let chat_id = cq
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(cq.from.id);
        return InboundUpdate::ButtonPress {
            callback_id: cq.id,
            chat_id: ChatId::Id(chat_id),
            user_id: cq.from.id.to_string(),
            choice: ButtonChoice::from_data(cq.data.as_deref().unwrap_or("")),
        };
    }

    let Some(message) = update.message else {
        return InboundUpdate::Ignored;
    };
    let chat_id = ChatId::Id(message.chat.id);

    if let Some(ref text) = message.text {
        if text.starts_with('/') {
            return InboundUpdate::Command {
                chat_id,
                command: text.clone(),
            };
        }
        return InboundUpdate::Text {
            chat_id,
            user_id: sender_id(&message),
            text: text.clone(),
        };
    }

    match media_of(&message) {
        Some(media) => InboundUpdate::Media {
            chat_id,
            user_id: sender_id(&message),
            media,
        },
        None => InboundUpdate::Ignored,
    }
}
