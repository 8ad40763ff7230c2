//! Errors surfaced by the webhook handlers.

use crate::channels::TransportError;
use crate::config::ConfigError;

/// Anything that stops a webhook request from completing. Everything except a signature
/// mismatch is answered with a 500.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid signature")]
    Signature,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("invalid request body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("invalid event: {0}")]
    Invalid(String),
}
