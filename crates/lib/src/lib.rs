//! Relay core library: Telegram and respond.io transports, the message translators
//! between them, and the webhook gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod error;
pub mod gateway;
pub mod translate;
