use std::time::Duration;

use async_trait::async_trait;
use lead_followup_core::chat::{extract_reply, generate_content_body, ChatTurn};
use serde_json::Value;

pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_GEMINI_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat upstream request failed: {0}")]
    Transport(String),
    #[error("chat upstream returned status {status}")]
    Status { status: u16, body: String },
    #[error("chat upstream response was malformed: {0}")]
    Malformed(String),
}

/// Produces an assistant reply for a validated conversation. `Ok(None)` means
/// the upstream answered but had no candidate text.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<Option<String>, ChatError>;
}

#[derive(Debug, Clone)]
pub struct GeminiChatClient {
    http_client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiChatClient {
    pub fn new(
        http_client: reqwest::Client,
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_GEMINI_TIMEOUT,
        }
    }

    /// Upper bound for one completion, connect through last body byte.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn generate_content_endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ChatCompleter for GeminiChatClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<Option<String>, ChatError> {
        let response = self
            .http_client
            .post(self.generate_content_endpoint())
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .json(&generate_content_body(turns))
            .send()
            .await
            .map_err(|error| ChatError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|error| ChatError::Malformed(error.without_url().to_string()))?;
        Ok(extract_reply(&payload))
    }
}
