//! weather-agent Server
//!
//! One binary, three modes selected by environment flags:
//!
//! - default: Axum HTTP server exposing the protocol endpoint plus a
//!   direct question endpoint and health check
//! - `MCP_STDIO=true`: long-lived protocol session over stdin/stdout
//! - `MCP_CLIENT=true`: interactive chat client driving a running
//!   server through the orchestration loop

mod chat;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{GenerationOptions, LlmProvider};
use agent_mcp::{McpSession, serve_stdio};
use agent_runtime::OllamaProvider;
use weather_tools::{NwsClient, weather_registry};

use crate::handlers::{health_check, mcp_handler, question_handler};
use crate::state::AppState;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before anything reads it
    dotenvy::dotenv().ok();

    // Initialize tracing. Logs go to stderr: in stdio mode, stdout
    // carries protocol frames.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if env_flag("MCP_STDIO") {
        return run_stdio().await;
    }

    let mut options = GenerationOptions::default();
    if let Ok(model) = std::env::var("OLLAMA_MODEL") {
        options.model = model;
    }

    let provider = Arc::new(OllamaProvider::from_env());
    match provider.health_check().await {
        Ok(true) => tracing::info!("Connected to Ollama"),
        Ok(false) | Err(_) => {
            tracing::warn!("Ollama not available, completions will fail");
            tracing::warn!("Make sure Ollama is running: ollama serve");
        }
    }

    if env_flag("MCP_CLIENT") {
        return chat::run(provider, options).await;
    }

    run_http(provider, options).await
}

/// Serve one protocol session over the process pipes.
async fn run_stdio() -> anyhow::Result<()> {
    let api = Arc::new(NwsClient::new());
    let registry = Arc::new(weather_registry(api));

    tracing::info!(
        "Serving protocol session on stdio with {} tools",
        registry.len()
    );

    let session = McpSession::new(registry);
    serve_stdio(session).await?;
    Ok(())
}

async fn run_http(
    provider: Arc<OllamaProvider>,
    options: GenerationOptions,
) -> anyhow::Result<()> {
    let app_name = std::env::var("APP_NAME").unwrap_or_else(|_| "service".into());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let state = AppState {
        api: Arc::new(NwsClient::new()),
        provider,
        options,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mcp_path = format!("/{app_name}/v1.0/mcp");
    let question_path = format!("/{app_name}/v1.0/question");

    let app = Router::new()
        .route("/health", get(health_check))
        .route(&mcp_path, post(mcp_handler))
        .route(&question_path, post(question_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("weather-agent server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST {}", mcp_path);
    tracing::info!("  POST {}", question_path);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_runtime::OllamaConfig;

    // The startup path calls health_check on the concrete provider,
    // before any trait-object coercion.
    #[tokio::test]
    async fn test_health_check_on_concrete_provider() {
        let provider = Arc::new(OllamaProvider::new(OllamaConfig {
            host: "localhost".into(),
            port: 1,
        }));
        let healthy = provider.health_check().await.unwrap();
        assert!(!healthy);
    }
}
