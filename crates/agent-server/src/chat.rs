//! Interactive Chat Client
//!
//! Connects to a running protocol server, then reads queries from the
//! terminal and runs each through the orchestration loop until the
//! user types `quit` or closes stdin.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use agent_core::{Conversation, GenerationOptions, LlmProvider, Orchestrator, ToolSession};
use agent_mcp::McpClient;

const SYSTEM_PROMPT: &str = "You are a helpful weather assistant. Use the available \
tools to answer questions about weather alerts and forecasts for US locations.";

pub async fn run(
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
) -> anyhow::Result<()> {
    let server_url = std::env::var("MCP_SERVER_URL")
        .unwrap_or_else(|_| "http://localhost:8080/service/v1.0/mcp".into());

    let client = Arc::new(McpClient::new());
    client.connect(&server_url).await?;

    let orchestrator = Orchestrator::new(provider, client.clone(), options);
    let mut conversation = Conversation::with_system_prompt(SYSTEM_PROMPT);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Weather chat started. Type your queries or 'quit' to exit.\n")
        .await?;

    loop {
        stdout.write_all(b"\nQuery: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        let answer = orchestrator.process_query(&mut conversation, query).await;
        stdout.write_all(b"\n").await?;
        stdout.write_all(answer.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    client.close().await?;
    Ok(())
}
