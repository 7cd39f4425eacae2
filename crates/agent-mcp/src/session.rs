//! Server-side Protocol Session
//!
//! One session per transport binding: request-scoped for HTTP (created
//! and closed around a single inbound request), long-lived for the
//! stdio pipe. The session owns its tool registry handle and a
//! lifecycle state; transports deliver the close signal by calling
//! [`McpSession::close`] when their underlying channel ends.

use std::collections::HashMap;
use std::sync::Arc;

use agent_core::{AgentError, ToolCall, ToolRegistry};

use crate::protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    METHOD_NOT_FOUND, PROTOCOL_VERSION, PeerInfo, ServerCapabilities, ToolsCapability, WireTool,
};

/// Session lifecycle state. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Connecting,
    Ready,
    Closed,
}

/// A stateful protocol session over some transport
pub struct McpSession {
    tools: Arc<ToolRegistry>,
    state: SessionState,
}

impl McpSession {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle one framed message. Notifications yield `None`.
    pub async fn handle(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if self.state == SessionState::Closed {
            if request.is_notification() {
                return None;
            }
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(INVALID_REQUEST, "Session closed"),
            ));
        }

        tracing::debug!(method = %request.method, "Handling protocol message");

        match request.method.as_str() {
            "initialize" => {
                self.state = SessionState::Connecting;
                Some(JsonRpcResponse::success(request.id, self.initialize_result()))
            }
            "notifications/initialized" => {
                self.state = SessionState::Ready;
                tracing::debug!("Session ready");
                None
            }
            // Request-scoped HTTP transports are stateless: tool
            // operations are served without the handshake.
            "tools/list" => Some(JsonRpcResponse::success(
                request.id,
                ListToolsResult {
                    tools: self.tools.schemas().iter().map(WireTool::from).collect(),
                },
            )),
            "tools/call" => Some(self.call_tool(request.id, request.params).await),
            _ if request.is_notification() => None,
            method => Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(METHOD_NOT_FOUND, format!("Unknown method: {}", method)),
            )),
        }
    }

    /// Tear down the session. Idempotent, safe to call even if the
    /// handshake never completed.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::debug!("Session closed");
            self.state = SessionState::Closed;
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            server_info: PeerInfo {
                name: "weather".into(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
        }
    }

    async fn call_tool(
        &self,
        id: Option<crate::protocol::RequestId>,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(p)) => p,
            Ok(None) | Err(_) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::new(INVALID_PARAMS, "Invalid tools/call parameters"),
                );
            }
        };

        let arguments: HashMap<String, serde_json::Value> = params
            .arguments
            .and_then(|v| v.as_object().cloned())
            .map(|map| map.into_iter().collect())
            .unwrap_or_default();

        let call = ToolCall {
            name: params.name,
            arguments,
            id: None,
        };

        tracing::info!(tool = %call.name, "Dispatching tool call");

        match self.tools.execute(&call).await {
            Ok(envelope) => JsonRpcResponse::success(
                id,
                CallToolResult {
                    content: envelope.content,
                    is_error: false,
                },
            ),
            Err(e @ AgentError::ToolNotFound(_)) => {
                JsonRpcResponse::error(id, JsonRpcError::new(INVALID_PARAMS, e.to_string()))
            }
            Err(e @ AgentError::ToolValidation { .. }) => {
                JsonRpcResponse::error(id, JsonRpcError::new(INVALID_PARAMS, e.to_string()))
            }
            Err(e) => JsonRpcResponse::error(
                id,
                JsonRpcError::new(INTERNAL_ERROR, format!("Tool execution error: {}", e)),
            ),
        }
    }
}
