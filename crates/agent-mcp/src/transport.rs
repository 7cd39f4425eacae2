//! Pipe Transport
//!
//! Line-delimited JSON-RPC over the process standard streams, for
//! command-line and subprocess integration. One long-lived session for
//! the process lifetime; EOF on stdin is the transport-close event and
//! deterministically tears the session down.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use agent_core::Result;

use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::session::McpSession;

/// Serve one session over stdin/stdout until the pipe closes.
pub async fn serve_stdio(mut session: McpSession) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => session.handle(request).await,
            Err(e) => {
                tracing::warn!("Discarding unparseable frame: {}", e);
                Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ))
            }
        };

        if let Some(response) = response {
            let json = serde_json::to_string(&response)?;
            stdout.write_all(json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    // Peer closed the pipe
    session.close();
    Ok(())
}
