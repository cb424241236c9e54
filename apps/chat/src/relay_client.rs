//! HTTP client for the relay's `POST /chat`.

use advisor_api::models::chat::{ChatRequest, ChatResponse, ErrorBody, Turn};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("could not reach the advisor service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("advisor service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response from the advisor service: {0}")]
    Malformed(String),
}

#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    chat_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            chat_url: format!("{}/chat", base_url.trim_end_matches('/')),
        }
    }

    /// One request, no retries.
    pub async fn chat(&self, message: &str, history: &[Turn]) -> Result<ChatResponse, RelayError> {
        let request = ChatRequest {
            message: Some(message.to_string()),
            conversation_history: Some(history.to_vec()),
        };

        debug!("POST {} ({} history turns)", self.chat_url, history.len());
        let response = self.client.post(&self.chat_url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.detail.unwrap_or(e.error))
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(RelayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<ChatResponse>(&body).map_err(|e| RelayError::Malformed(e.to_string()))
    }
}
