//! Webhook signature checks.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Header carrying the Telegram webhook signature.
pub const TELEGRAM_SIGNATURE_HEADER: &str = "x-telegram-bot-api-secret-token";

/// `sha256=<hex HMAC-SHA256(key = SHA-256(secret), body)>`.
pub fn telegram_signature(secret: &str, body: &[u8]) -> Option<String> {
    let key = Sha256::digest(secret.as_bytes());
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// No secret configured: everything passes. Otherwise the header must equal the expected
/// signature exactly.
pub fn verify_telegram_signature(
    body: &[u8],
    provided: Option<&str>,
    secret: Option<&str>,
) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    match (telegram_signature(secret, body), provided) {
        (Some(expected), Some(provided)) => expected == provided,
        _ => false,
    }
}

/// respond.io signature check. The signing scheme is not implemented; every request passes.
pub fn verify_respond_io_signature(
    _body: &[u8],
    _provided: Option<&str>,
    _secret: Option<&str>,
) -> bool {
    true
}
