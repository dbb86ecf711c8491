use std::sync::Arc;

use crate::config::Config;
use crate::github_client::ContentStore;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Model backend. Default: `LlmClient` (Gemini).
    pub llm: Arc<dyn TextGenerator>,
    /// Versioned file store holding the problem collection. Default: `GitHubClient`.
    pub store: Arc<dyn ContentStore>,
}
