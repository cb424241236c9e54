use anyhow::{bail, Context, Result};

use crate::llm_client::{Credentials, Protocol};

const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_TOKEN_SCOPE: &str = "https://ai.azure.com/.default";

/// Application configuration loaded from environment variables.
/// Built once at startup and injected into handlers through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub port: u16,
    pub rust_log: String,
}

/// Everything needed to reach the hosted model.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL, without a trailing slash.
    pub endpoint: String,
    pub deployment: String,
    pub protocol: Protocol,
    pub api_version: String,
    /// Full URL of the responses endpoint. Only used with `Protocol::Responses`.
    pub responses_url: String,
    pub authority_host: String,
    pub token_scope: String,
    /// `None` keeps the server up; every chat call then fails with a configuration error.
    pub credentials: Option<Credentials>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            provider: ProviderConfig::from_lookup(|key| std::env::var(key).ok())?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl ProviderConfig {
    /// Resolves provider settings from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = get("AZURE_ENDPOINT")
            .context("Required environment variable 'AZURE_ENDPOINT' is not set")?
            .trim_end_matches('/')
            .to_string();

        let credentials = resolve_credentials(
            get("AZURE_API_KEY"),
            get("AZURE_CLIENT_ID"),
            get("AZURE_CLIENT_SECRET"),
            get("AZURE_TENANT_ID"),
        )?;

        let protocol = match get("AZURE_PROTOCOL") {
            Some(raw) => raw.parse::<Protocol>()?,
            None => match &credentials {
                Some(Credentials::ServicePrincipal { .. }) => Protocol::Responses,
                _ => Protocol::ChatCompletions,
            },
        };

        let api_version = get("AZURE_API_VERSION")
            .unwrap_or_else(|| protocol.default_api_version().to_string());
        let responses_url =
            get("AZURE_RESPONSES_URL").unwrap_or_else(|| format!("{endpoint}/openai/responses"));

        Ok(ProviderConfig {
            deployment: get("AZURE_DEPLOYMENT").unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            protocol,
            api_version,
            responses_url,
            authority_host: get("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
                .trim_end_matches('/')
                .to_string(),
            token_scope: get("AZURE_TOKEN_SCOPE").unwrap_or_else(|| DEFAULT_TOKEN_SCOPE.to_string()),
            credentials,
            endpoint,
        })
    }
}

/// A static key wins over a service principal. A partially set triplet is an error.
fn resolve_credentials(
    api_key: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    tenant_id: Option<String>,
) -> Result<Option<Credentials>> {
    if let Some(key) = api_key {
        return Ok(Some(Credentials::ApiKey(key)));
    }

    match (client_id, client_secret, tenant_id) {
        (Some(client_id), Some(client_secret), Some(tenant_id)) => {
            Ok(Some(Credentials::ServicePrincipal {
                client_id,
                client_secret,
                tenant_id,
            }))
        }
        (None, None, None) => Ok(None),
        _ => bail!(
            "Incomplete service principal: AZURE_CLIENT_ID, AZURE_CLIENT_SECRET and \
             AZURE_TENANT_ID must all be set"
        ),
    }
}
