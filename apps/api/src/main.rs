use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use advisor_api::config::Config;
use advisor_api::llm_client::{AzureClient, Credentials};
use advisor_api::routes::build_router;
use advisor_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing endpoint or a partial service principal)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Job Advisor API v{}", env!("CARGO_PKG_VERSION"));

    match &config.provider.credentials {
        Some(Credentials::ApiKey(_)) => info!("Provider auth: static API key"),
        Some(Credentials::ServicePrincipal { tenant_id, .. }) => {
            info!("Provider auth: service principal (tenant {tenant_id})")
        }
        None => warn!("No provider credentials configured; every chat call will fail with 500"),
    }

    // Initialize LLM client
    let provider = AzureClient::new(config.provider.clone());
    info!(
        "LLM client initialized (deployment: {}, protocol: {:?})",
        config.provider.deployment,
        provider.protocol()
    );

    let port = config.port;
    let state = AppState::new(config, Arc::new(provider));

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
