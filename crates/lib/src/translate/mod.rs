//! Message translation between Telegram and respond.io.
//!
//! One entry point per direction: [`TelegramRelay::handle`] for Telegram updates and
//! [`relay_event`] for respond.io webhook events. Both dispatch on sum types, so every
//! message kind is handled explicitly.

pub mod canned;
mod inbound;
pub mod mime;
mod respond_io;
mod telegram;
#[cfg(test)]
mod testing;

pub use inbound::{classify, ButtonChoice, InboundMedia, InboundUpdate, TelegramMediaKind};
pub use respond_io::{relay_event, Delivery};
pub use telegram::{media_file_name, TelegramRelay};
