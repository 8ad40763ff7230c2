//! Shared failure type for outbound platform calls.

/// A failed call to the Telegram or respond.io API.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Non-2xx response; `body` is the raw response text.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status of a non-2xx response, if that is what failed.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Turn a non-2xx response into [`TransportError::Status`], consuming the body.
pub(crate) async fn check_status(
    res: reqwest::Response,
) -> Result<reqwest::Response, TransportError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(TransportError::Status { status, body })
}
