mod config;
mod errors;
mod generation;
mod github_client;
mod llm_client;
mod models;
mod persistence;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::github_client::GitHubClient;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting problems API v{}", env!("CARGO_PKG_VERSION"));

    // Credentials are checked per request so /health stays up without them.
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; /api/generate will fail");
    }
    if config.github_token.is_none() {
        warn!("GITHUB_TOKEN is not set; /api/problems will fail");
    }

    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
    );
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let store = GitHubClient::new(config.github_token.clone(), config.github_api_url.clone());
    let location = config.file_location();
    info!(
        "Problem bank at {}/{}:{} on {}",
        location.owner, location.repo, location.path, location.branch
    );

    let state = AppState {
        config: config.clone(),
        llm: Arc::new(llm),
        store: Arc::new(store),
    };

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
