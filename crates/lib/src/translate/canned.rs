//! Fixed user-facing texts sent to Telegram users.

use crate::channels::{EngagementMediaKind, TransportError};

pub const START_FAILED: &str = "Произошла ошибка. Попробуйте позже.";

pub const BUTTON_YES: &str = "Да";
pub const BUTTON_NO: &str = "Нет";
pub const CALLBACK_YES: &str = "yes";
pub const CALLBACK_NO: &str = "no";

/// Forwarded to respond.io when the user presses a button.
pub const CHOSE_YES: &str = "Пользователь выбрал: Да";
pub const CHOSE_NO: &str = "Пользователь выбрал: Нет";

pub const REPLY_YES: &str =
    "Спасибо! Теперь вы можете написать ваш вопрос, и я передам его нашим специалистам.";
pub const REPLY_NO: &str = "Понятно. Если передумаете, просто напишите /start снова.";
pub const BUTTON_FAILED: &str = "Произошла ошибка";

pub const TEXT_FAILED: &str = "Извините, не удалось обработать ваше сообщение. Попробуйте позже.";
pub const TEXT_BAD_FORMAT: &str = "Ошибка формата сообщения. Разработчики уведомлены.";
pub const TEXT_UNAUTHORIZED: &str = "Ошибка авторизации. Разработчики уведомлены.";

/// Sent to Telegram when an agent message has an unsupported kind and no text.
pub const AGENT_PLACEHOLDER: &str = "Сообщение от поддержки";

/// Reply for a text message respond.io refused, chosen by HTTP status.
pub fn text_failure_reply(err: &TransportError) -> &'static str {
    match err.status() {
        Some(400) => TEXT_BAD_FORMAT,
        Some(401) => TEXT_UNAUTHORIZED,
        _ => TEXT_FAILED,
    }
}

/// Genitive noun for a media kind ("error while processing ...").
fn media_noun(kind: EngagementMediaKind) -> &'static str {
    match kind {
        EngagementMediaKind::Photo => "изображения",
        EngagementMediaKind::Document => "документа",
        EngagementMediaKind::Video => "видео",
        EngagementMediaKind::Audio => "голосового сообщения",
        EngagementMediaKind::Sticker => "стикера",
    }
}

pub fn media_failure_reply(kind: EngagementMediaKind) -> String {
    format!("Произошла ошибка при обработке {}.", media_noun(kind))
}
