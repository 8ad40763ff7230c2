//! Gateway: HTTP webhook endpoints for both platforms plus a health page.
//!
//! `POST /telegram/webhook` relays Telegram updates to respond.io, `POST /respond-io/webhook`
//! relays respond.io agent messages to Telegram, `GET /health` reports configuration.
//! Every webhook request reads configuration afresh and runs to completion on its own.

mod server;
mod signature;

pub use server::{router, run_gateway, GatewayState, RESPOND_IO_WEBHOOK_PATH, TELEGRAM_WEBHOOK_PATH};
pub use signature::{
    telegram_signature, verify_respond_io_signature, verify_telegram_signature,
    TELEGRAM_SIGNATURE_HEADER,
};
