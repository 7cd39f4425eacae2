//! Application State

use std::sync::Arc;

use agent_core::{GenerationOptions, LlmProvider};
use weather_tools::WeatherApi;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Upstream weather API client, shared across request-scoped
    /// tool registries
    pub api: Arc<dyn WeatherApi>,

    /// LLM provider (Ollama, etc.)
    pub provider: Arc<dyn LlmProvider>,

    /// Generation settings for direct question answering
    pub options: GenerationOptions,
}
