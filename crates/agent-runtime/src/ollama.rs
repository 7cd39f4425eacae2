//! Ollama Provider
//!
//! [`LlmProvider`] backed by a local Ollama daemon, speaking its REST
//! chat API directly. Tool definitions are passed through as function
//! schemas; tool-call directives returned by the model are lifted into
//! the core [`ToolCall`] type with synthesized correlation ids.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agent_core::tool::{ToolCall, ToolDescriptor};
use agent_core::{
    AgentError, Completion, GenerationOptions, LlmProvider, Message, Result,
    provider::TokenUsage,
};

/// Connection settings for the Ollama daemon
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 11434,
        }
    }
}

impl OllamaConfig {
    /// Read `OLLAMA_HOST` / `OLLAMA_PORT` from the environment,
    /// falling back to the local daemon defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("OLLAMA_HOST").unwrap_or(defaults.host),
            port: std::env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// Ollama-backed LLM provider
pub struct OllamaProvider {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(OllamaConfig::from_env())
    }
}

// --- Wire types for the Ollama chat API ---

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireToolDef>,
    stream: bool,
    options: WireOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct WireToolDef {
    #[serde(rename = "type")]
    def_type: String,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct WireOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: WireMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

fn wire_message(message: &Message) -> WireMessage {
    WireMessage {
        role: message.role.to_string(),
        content: message.content.clone(),
        tool_calls: message
            .tool_calls
            .iter()
            .map(|call| WireToolCall {
                function: WireFunctionCall {
                    name: call.name.clone(),
                    arguments: serde_json::to_value(&call.arguments)
                        .unwrap_or(Value::Null),
                },
            })
            .collect(),
    }
}

fn wire_tool(tool: &ToolDescriptor) -> WireToolDef {
    WireToolDef {
        def_type: "function".into(),
        function: WireFunctionDef {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.clone(),
        },
    }
}

/// Lift a wire tool call into the core type, synthesizing a
/// correlation id from its position in the response.
fn lift_tool_call(index: usize, call: WireToolCall) -> ToolCall {
    let arguments = call
        .function
        .arguments
        .as_object()
        .map(|map| map.clone().into_iter().collect())
        .unwrap_or_default();

    ToolCall {
        name: call.function.name,
        arguments,
        id: Some(format!("call-{}", index + 1)),
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = ChatRequest {
            model: options.model.clone(),
            messages: messages.iter().map(wire_message).collect(),
            tools: tools.iter().map(wire_tool).collect(),
            stream: false,
            options: WireOptions {
                temperature: options.temperature,
                top_p: options.top_p,
                num_predict: options.max_tokens,
            },
        };

        tracing::debug!(
            model = %request.model,
            tools = tools.len(),
            messages = messages.len(),
            "Sending chat request to Ollama"
        );

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!(
                "Ollama returned status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("invalid Ollama response: {}", e)))?;

        let tool_calls: Vec<ToolCall> = chat
            .message
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(i, call)| lift_tool_call(i, call))
            .collect();

        if !tool_calls.is_empty() {
            tracing::debug!(count = tool_calls.len(), "Model requested tool calls");
        }

        Ok(Completion {
            content: chat.message.content,
            model: chat.model,
            tool_calls,
            usage: Some(TokenUsage {
                prompt_tokens: chat.prompt_eval_count,
                completion_tokens: chat.eval_count,
                total_tokens: chat.prompt_eval_count + chat.eval_count,
            }),
        })
    }
}
