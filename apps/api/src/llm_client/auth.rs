//! Service-principal token exchange (OAuth2 client credentials grant).

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use super::LlmError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchanges a client id/secret pair for a short-lived bearer token.
/// The token is used for one invocation and then dropped.
pub async fn exchange_client_credentials(
    client: &Client,
    authority_host: &str,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
    scope: &str,
) -> Result<String, LlmError> {
    let url = format!("{authority_host}/{tenant_id}/oauth2/v2.0/token");
    debug!("Requesting token for tenant {tenant_id} with scope {scope}");

    let response = client
        .post(&url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", scope),
        ])
        .send()
        .await
        .map_err(|e| {
            error!("Token endpoint unreachable: {e}");
            LlmError::TokenExchange(format!("identity provider unreachable: {e}"))
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::TokenExchange(format!("unreadable token response: {e}")))?;

    if !status.is_success() {
        let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(TokenErrorResponse {
                error,
                error_description: Some(description),
            }) => format!("{error}: {description}"),
            Ok(TokenErrorResponse { error, .. }) => error,
            Err(_) => body,
        };
        error!("Token exchange returned {status}: {detail}");
        return Err(LlmError::TokenExchange(format!("status {status}: {detail}")));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| LlmError::TokenExchange(format!("token response missing access_token: {e}")))?;

    debug!("Token acquired");
    Ok(token.access_token)
}
