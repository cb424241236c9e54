//! LLM Client — the single point of entry for all model provider calls in the advisor.
//!
//! ARCHITECTURAL RULE: No other module may call the provider directly.
//! Handlers talk to the `ChatProvider` trait held in `AppState`.
//!
//! One attempt per call. There is no retry loop and no token cache here.
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::models::chat::Turn;

pub mod auth;
pub mod extract;

/// Upper bound on generated tokens. Recommendations are short.
pub const MAX_OUTPUT_TOKENS: u32 = 1000;
/// Low randomness keeps recommendations stable across identical postings.
pub const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Provider credentials. Never printed: `Debug` redacts every secret.
#[derive(Clone)]
pub enum Credentials {
    ApiKey(String),
    ServicePrincipal {
        client_id: String,
        client_secret: String,
        tenant_id: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credentials::ServicePrincipal {
                client_id,
                tenant_id,
                ..
            } => f
                .debug_struct("ServicePrincipal")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("tenant_id", tenant_id)
                .finish(),
        }
    }
}

/// What actually goes on the wire after authentication.
#[derive(Clone)]
pub enum Authorization {
    ApiKey(String),
    Bearer(String),
}

impl Authorization {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Authorization::ApiKey(key) => request.header("api-key", key),
            Authorization::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// Which invocation style the provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// `/openai/deployments/{deployment}/chat/completions`
    ChatCompletions,
    /// Responses protocol, as exposed by hosted agent applications.
    Responses,
}

impl Protocol {
    pub fn default_api_version(self) -> &'static str {
        match self {
            Protocol::ChatCompletions => "2024-10-21",
            Protocol::Responses => "2025-11-15-preview",
        }
    }
}

impl FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat_completions" | "chat-completions" => Ok(Protocol::ChatCompletions),
            "responses" => Ok(Protocol::Responses),
            other => anyhow::bail!(
                "AZURE_PROTOCOL must be 'chat_completions' or 'responses', got '{other}'"
            ),
        }
    }
}

/// The provider seam. Carried in `AppState` as `Arc<dyn ChatProvider>`.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Turns configured credentials into a request authorization.
    /// Static keys pass through; service principals cost one identity call.
    async fn authorize(&self, credentials: &Credentials) -> Result<Authorization, LlmError>;

    /// Sends the full message list once and returns the raw success body.
    async fn complete(&self, auth: &Authorization, messages: &[Turn]) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    messages: &'a [Turn],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a [Turn],
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Azure-hosted model client. Stateless apart from the pooled HTTP client,
/// so one instance is shared by every concurrent invocation.
#[derive(Clone)]
pub struct AzureClient {
    client: Client,
    settings: ProviderConfig,
}

impl AzureClient {
    pub fn new(settings: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.settings.protocol
    }

    fn completion_url(&self) -> String {
        match self.settings.protocol {
            Protocol::ChatCompletions => format!(
                "{}/openai/deployments/{}/chat/completions",
                self.settings.endpoint, self.settings.deployment
            ),
            Protocol::Responses => self.settings.responses_url.clone(),
        }
    }
}

#[async_trait]
impl ChatProvider for AzureClient {
    async fn authorize(&self, credentials: &Credentials) -> Result<Authorization, LlmError> {
        match credentials {
            Credentials::ApiKey(key) => Ok(Authorization::ApiKey(key.clone())),
            Credentials::ServicePrincipal {
                client_id,
                client_secret,
                tenant_id,
            } => {
                let token = auth::exchange_client_credentials(
                    &self.client,
                    &self.settings.authority_host,
                    tenant_id,
                    client_id,
                    client_secret,
                    &self.settings.token_scope,
                )
                .await?;
                Ok(Authorization::Bearer(token))
            }
        }
    }

    async fn complete(&self, auth: &Authorization, messages: &[Turn]) -> Result<String, LlmError> {
        let url = self.completion_url();
        debug!(
            "Calling provider: {url} ({} messages, {:?})",
            messages.len(),
            self.settings.protocol
        );

        let mut request = self.client.post(&url);
        // Agent URLs are often copied with the version already in the query string
        if !url.contains("api-version=") {
            request = request.query(&[("api-version", self.settings.api_version.as_str())]);
        }

        let request = match self.settings.protocol {
            Protocol::ChatCompletions => request.json(&ChatCompletionsRequest {
                messages,
                max_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            }),
            Protocol::Responses => request.json(&ResponsesRequest {
                model: &self.settings.deployment,
                input: messages,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            }),
        };

        let response = auth.apply(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Provider returned {status}: {body}");
            // Try to parse error message
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Provider call succeeded: {} bytes", body.len());
        Ok(body)
    }
}
