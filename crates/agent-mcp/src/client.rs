//! Client-side Protocol Session (HTTP transport)
//!
//! Posts framed JSON-RPC requests to a server endpoint, mirroring the
//! server session's lifecycle on this side: `connect` performs the
//! initialize handshake and caches the advertised tool list, after
//! which the client is `Ready` and usable by the orchestration loop.

use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use agent_core::tool::ToolDescriptor;
use agent_core::{AgentError, ContentEnvelope, Result, ToolSession};

use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcRequest,
    ListToolsResult,
};
use crate::session::SessionState;

// All session state lives behind one lock so no call path ever holds
// two guards at once.
#[derive(Debug)]
struct ClientInner {
    state: SessionState,
    endpoint: Option<String>,
    tools: Vec<ToolDescriptor>,
}

impl Default for ClientInner {
    fn default() -> Self {
        Self {
            state: SessionState::Uninitialized,
            endpoint: None,
            tools: Vec::new(),
        }
    }
}

/// Protocol client over HTTP request/response
pub struct McpClient {
    http: reqwest::Client,
    inner: RwLock<ClientInner>,
    next_id: AtomicI64,
}

impl Default for McpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl McpClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            inner: RwLock::new(ClientInner::default()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().unwrap().state
    }

    /// Connect to a server endpoint: initialize, announce readiness,
    /// and cache the advertised tool list.
    ///
    /// `Closed` is terminal: a closed client cannot reconnect.
    pub async fn connect(&self, url: &str) -> Result<()> {
        {
            let mut inner = self.inner.write().unwrap();
            if inner.state == SessionState::Closed {
                return Err(AgentError::Session("session closed".into()));
            }
            inner.state = SessionState::Connecting;
            inner.endpoint = Some(url.to_string());
        }
        tracing::info!("Connecting to tool server: {}", url);

        match self.handshake().await {
            Ok(tools) => {
                tracing::info!(
                    "Connected. Available tools: {}",
                    tools
                        .iter()
                        .map(|t| t.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                let mut inner = self.inner.write().unwrap();
                inner.tools = tools;
                inner.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to connect to tool server: {}", e);
                let mut inner = self.inner.write().unwrap();
                inner.endpoint = None;
                inner.tools.clear();
                inner.state = SessionState::Uninitialized;
                Err(e)
            }
        }
    }

    async fn handshake(&self) -> Result<Vec<ToolDescriptor>> {
        let _init: InitializeResult = self
            .request("initialize", Some(InitializeParams::default()))
            .await?;
        self.notify("notifications/initialized").await?;

        let list: ListToolsResult = self.request("tools/list", None::<()>).await?;
        Ok(list.tools.into_iter().map(ToolDescriptor::from).collect())
    }

    fn endpoint(&self) -> Result<String> {
        self.inner
            .read()
            .unwrap()
            .endpoint
            .clone()
            .ok_or_else(|| AgentError::Session("not connected".into()))
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let endpoint = self.endpoint()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut request = JsonRpcRequest::new(id, method);
        if let Some(p) = params {
            request = request.with_params(p);
        }

        let response = self
            .http
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Session(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Session(format!(
                "server returned status {}",
                status
            )));
        }

        let framed: crate::protocol::JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))?;

        let value = framed
            .into_result()
            .map_err(|e| AgentError::Protocol(e.to_string()))?;

        serde_json::from_value(value).map_err(|e| AgentError::Protocol(e.to_string()))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let endpoint = self.endpoint()?;
        let request = JsonRpcRequest::notification(method);

        let response = self
            .http
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Session(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::Session(format!(
                "server returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ToolSession for McpClient {
    fn is_connected(&self) -> bool {
        self.state() == SessionState::Ready
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        self.inner.read().unwrap().tools.clone()
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ContentEnvelope> {
        if !self.is_connected() {
            return Err(AgentError::Session("not connected".into()));
        }

        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        let result: CallToolResult = self.request("tools/call", Some(params)).await?;

        if result.is_error {
            let envelope = ContentEnvelope {
                content: result.content,
            };
            return Err(AgentError::ToolExecution(envelope.flatten_text()));
        }

        if result.content.is_empty() {
            // Tools must never hand back an empty envelope; cover for
            // peers that do anyway.
            return Ok(ContentEnvelope::text("Tool returned no content."));
        }

        Ok(ContentEnvelope {
            content: result.content,
        })
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.state != SessionState::Closed {
            tracing::info!("Disconnected from tool server");
            inner.state = SessionState::Closed;
            inner.endpoint = None;
            inner.tools.clear();
        }
        Ok(())
    }
}
