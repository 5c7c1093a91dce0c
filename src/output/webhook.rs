//! Webhook delivery.
//!
//! # Design Decisions
//! - Payload is wrapped as `{"text": <record json>}` (chat-webhook shape)
//! - Fixed 15 second total timeout per request
//! - No retries: errors go straight back to the caller

use std::time::Duration;

use thiserror::Error;

/// Total time allowed for one webhook POST.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

/// Client marker sent with every request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum WebhookError {
    /// The endpoint answered with a non-2xx status.
    #[error("bad response: {0}")]
    Status(u16),

    /// Connection, timeout, or request construction failure.
    #[error("webhook transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl WebhookError {
    /// HTTP status code, when the endpoint answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            WebhookError::Status(code) => Some(*code),
            WebhookError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// HTTP client used for webhook POSTs.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new() -> Result<Self, WebhookError> {
        Self::with_timeout(WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// POST `payload` to `url` wrapped as `{"text": payload}`.
    pub async fn post(&self, url: &str, payload: &str) -> Result<(), WebhookError> {
        let body = serde_json::json!({ "text": payload });
        let response = self.client.post(url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = %status, "Webhook rejected delivery");
            return Err(WebhookError::Status(status.as_u16()));
        }
        Ok(())
    }
}
