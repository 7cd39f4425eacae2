//! Tool System
//!
//! Named, schema-validated operations exposed through the protocol
//! session. Tools are registered at construction and invoked by the
//! protocol layer; every handler returns a content envelope, even on
//! degraded paths.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool call directive from the LLM
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,

    /// Optional correlation id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
            id: None,
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }
}

/// A single typed content block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    /// Get text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
        }
    }
}

/// Ordered sequence of content blocks produced by a tool.
///
/// Never empty: failure is communicated as a text block, not an
/// absent envelope. Construct through [`ContentEnvelope::text`] to
/// preserve that invariant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEnvelope {
    pub content: Vec<ContentBlock>,
}

impl ContentEnvelope {
    /// Single text-block envelope
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Flatten all text blocks into one string
    pub fn flatten_text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Exact character length (string parameters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    /// Inclusive lower bound (number parameters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Inclusive upper bound (number parameters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl ParameterSchema {
    /// Required string parameter of an exact length
    pub fn string_of_length(
        name: impl Into<String>,
        length: usize,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: "string".into(),
            description: description.into(),
            required: true,
            length: Some(length),
            minimum: None,
            maximum: None,
        }
    }

    /// Required number parameter within an inclusive range
    pub fn number_in_range(
        name: impl Into<String>,
        minimum: f64,
        maximum: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: "number".into(),
            description: description.into(),
            required: true,
            length: None,
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }
}

/// Tool definition schema (for LLM function calling and advertisement)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

/// Tool metadata as advertised over the wire: the input schema is an
/// opaque JSON Schema object so transports and providers need not know
/// about [`ParameterSchema`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Validate a set of arguments against a tool schema.
///
/// Runs before any handler code, so malformed input is rejected
/// without side effects (no network call is ever made for it).
pub fn validate_arguments(
    schema: &ToolSchema,
    arguments: &HashMap<String, serde_json::Value>,
) -> Result<()> {
    for param in &schema.parameters {
        let value = match arguments.get(&param.name) {
            Some(v) => v,
            None if param.required => {
                return Err(AgentError::validation(
                    &param.name,
                    "missing required parameter",
                ));
            }
            None => continue,
        };

        match param.param_type.as_str() {
            "string" => {
                let s = value.as_str().ok_or_else(|| {
                    AgentError::validation(&param.name, "expected a string")
                })?;
                if let Some(len) = param.length {
                    if s.chars().count() != len {
                        return Err(AgentError::validation(
                            &param.name,
                            format!("expected exactly {} characters", len),
                        ));
                    }
                }
            }
            "number" => {
                let n = value.as_f64().ok_or_else(|| {
                    AgentError::validation(&param.name, "expected a number")
                })?;
                if let Some(min) = param.minimum {
                    if n < min {
                        return Err(AgentError::validation(
                            &param.name,
                            format!("must be >= {}", min),
                        ));
                    }
                }
                if let Some(max) = param.maximum {
                    if n > max {
                        return Err(AgentError::validation(
                            &param.name,
                            format!("must be <= {}", max),
                        ));
                    }
                }
            }
            other => {
                return Err(AgentError::validation(
                    &param.name,
                    format!("unsupported parameter type '{}'", other),
                ));
            }
        }
    }

    Ok(())
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with validated arguments
    async fn execute(&self, call: &ToolCall) -> Result<ContentEnvelope>;
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let schema = tool.schema();
        self.tools.insert(schema.name.clone(), Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call: resolve the tool, validate the arguments,
    /// then run the handler.
    pub async fn execute(&self, call: &ToolCall) -> Result<ContentEnvelope> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        validate_arguments(&tool.schema(), &call.arguments)?;

        tool.execute(call).await
    }

    /// Get all tool schemas
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".into(),
                description: "Echo the input back".into(),
                parameters: vec![ParameterSchema::string_of_length(
                    "code",
                    2,
                    "Two-letter code",
                )],
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ContentEnvelope> {
            let code = call
                .arguments
                .get("code")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(ContentEnvelope::text(code.to_uppercase()))
        }
    }

    fn range_schema() -> ToolSchema {
        ToolSchema {
            name: "locate".into(),
            description: "Locate a point".into(),
            parameters: vec![
                ParameterSchema::number_in_range("latitude", -90.0, 90.0, "Latitude"),
                ParameterSchema::number_in_range("longitude", -180.0, 180.0, "Longitude"),
            ],
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_leaves_registry_unmodified() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let call = ToolCall::new("does-not-exist");
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(_)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_rejects_wrong_length() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let call = ToolCall::new("echo").with_argument("code", serde_json::json!("CAL"));
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation { .. }));
    }

    #[tokio::test]
    async fn test_validation_rejects_wrong_type() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let call = ToolCall::new("echo").with_argument("code", serde_json::json!(12));
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation { field, .. } if field == "code"));
    }

    #[test]
    fn test_validation_missing_required() {
        let schema = range_schema();
        let args = HashMap::from([("latitude".to_string(), serde_json::json!(40.0))]);
        let err = validate_arguments(&schema, &args).unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation { field, .. } if field == "longitude"));
    }

    #[test]
    fn test_validation_range_bounds() {
        let schema = range_schema();
        let args = HashMap::from([
            ("latitude".to_string(), serde_json::json!(91.5)),
            ("longitude".to_string(), serde_json::json!(0.0)),
        ]);
        assert!(validate_arguments(&schema, &args).is_err());

        let args = HashMap::from([
            ("latitude".to_string(), serde_json::json!(90)),
            ("longitude".to_string(), serde_json::json!(-180)),
        ]);
        assert!(validate_arguments(&schema, &args).is_ok());
    }

    #[tokio::test]
    async fn test_envelope_never_empty() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let call = ToolCall::new("echo").with_argument("code", serde_json::json!("ca"));
        let envelope = registry.execute(&call).await.unwrap();
        assert!(!envelope.is_empty());
        assert_eq!(envelope.flatten_text(), "CA");
    }
}
