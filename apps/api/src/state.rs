use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Generation backend. Default: `LlmClient`; tests inject canned responses.
    pub generator: Arc<dyn TextGenerator>,
    pub config: Config,
}
