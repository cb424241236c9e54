use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatProvider;
use crate::relay::prompts::system_instruction;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup; invocations share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Pluggable provider. Default: `AzureClient`. Tests swap in a mock.
    pub provider: Arc<dyn ChatProvider>,
    /// Rendered once from the résumé catalogue.
    pub system_instruction: Arc<str>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            system_instruction: system_instruction().into(),
        }
    }
}
