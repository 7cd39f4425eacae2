//! Model Orchestration Loop
//!
//! Drives one conversation turn: send the query to the completion
//! capability with the session's tool definitions, dispatch any
//! tool-call directives through the protocol session, feed results
//! back, and re-invoke the model exactly once for the final answer.
//! Tool-call recursion is bounded: a directive inside the second
//! completion is never executed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ContentEnvelope, ToolDescriptor};

/// Client-side view of a protocol session.
///
/// Implemented by transport bindings (HTTP, pipe). All operations are
/// non-reentrant: the loop runs one call to completion before issuing
/// the next.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Whether the session has completed its handshake
    fn is_connected(&self) -> bool;

    /// Tool metadata advertised by the peer
    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Invoke a named tool with the given argument object
    async fn call_tool(&self, name: &str, arguments: serde_json::Value)
        -> Result<ContentEnvelope>;

    /// Tear down the session. Idempotent, safe before connect.
    async fn close(&self) -> Result<()>;
}

/// The orchestration loop
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    session: Arc<dyn ToolSession>,
    options: GenerationOptions,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        session: Arc<dyn ToolSession>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            provider,
            session,
            options,
        }
    }

    /// Process one user query and return the final answer text.
    ///
    /// Never raises: session and provider failures come back as
    /// user-visible text, and per-directive tool failures are appended
    /// to the conversation instead of aborting the dispatch.
    pub async fn process_query(&self, conversation: &mut Conversation, query: &str) -> String {
        if !self.session.is_connected() {
            return "Not connected to a tool server. Please connect first.".into();
        }

        conversation.push(Message::user(query));

        match self.run_turn(conversation).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Query processing failed: {}", e);
                e.user_message()
            }
        }
    }

    async fn run_turn(&self, conversation: &mut Conversation) -> Result<String> {
        let tools = self.session.tools();

        let completion = self
            .provider
            .complete(conversation.messages(), &tools, &self.options)
            .await?;

        if !completion.has_tool_calls() {
            conversation.push(Message::assistant(&completion.content));
            return Ok(completion.content);
        }

        tracing::info!(
            count = completion.tool_calls.len(),
            "Model requested tool calls"
        );
        conversation.push(Message::assistant_with_calls(
            &completion.content,
            completion.tool_calls.clone(),
        ));

        // Directives run sequentially, never concurrently.
        for call in &completion.tool_calls {
            let arguments = serde_json::to_value(&call.arguments)?;
            tracing::debug!(tool = %call.name, "Dispatching tool call");

            let content = match self.session.call_tool(&call.name, arguments).await {
                Ok(envelope) => envelope.flatten_text(),
                Err(e) => {
                    tracing::warn!(tool = %call.name, "Tool call failed: {}", e);
                    format!("Error executing tool {}: {}", call.name, e)
                }
            };
            conversation.push(Message::tool(content, call.id.clone()));
        }

        // Exactly one re-invocation, with no tool definitions.
        let followup = self
            .provider
            .complete(conversation.messages(), &[], &self.options)
            .await?;
        conversation.push(Message::assistant(&followup.content));

        Ok(followup.content)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::AgentError;
    use crate::message::Role;
    use crate::provider::Completion;
    use crate::tool::ToolCall;

    struct MockProvider {
        calls: AtomicUsize,
        always_request_tools: bool,
    }

    impl MockProvider {
        fn new(always_request_tools: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                always_request_tools,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolDescriptor],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let tool_calls = if self.always_request_tools {
                vec![ToolCall {
                    name: "get-alerts".into(),
                    arguments: HashMap::from([(
                        "state".to_string(),
                        serde_json::json!("CA"),
                    )]),
                    id: Some("call-1".into()),
                }]
            } else {
                Vec::new()
            };

            Ok(Completion {
                content: "Let me check.".into(),
                model: options.model.clone(),
                tool_calls,
                usage: None,
            })
        }
    }

    struct MockSession {
        connected: bool,
        fail_calls: bool,
        calls: AtomicUsize,
    }

    impl MockSession {
        fn connected() -> Self {
            Self {
                connected: true,
                fail_calls: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail_calls: true,
                ..Self::connected()
            }
        }
    }

    #[async_trait]
    impl ToolSession for MockSession {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn tools(&self) -> Vec<ToolDescriptor> {
            vec![ToolDescriptor {
                name: "get-alerts".into(),
                description: "Get weather alerts for a state".into(),
                input_schema: serde_json::json!({"type": "object"}),
            }]
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: serde_json::Value,
        ) -> Result<ContentEnvelope> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_calls {
                return Err(AgentError::ToolExecution(format!("{} blew up", name)));
            }
            Ok(ContentEnvelope::text("No active alerts for CA"))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn orchestrator(provider: MockProvider, session: MockSession) -> Orchestrator {
        Orchestrator::new(
            Arc::new(provider),
            Arc::new(session),
            GenerationOptions::default(),
        )
    }

    /// Every tool message must immediately follow an assistant message
    /// carrying the matching directive.
    fn assert_tool_messages_follow_directives(conversation: &Conversation) {
        let messages = conversation.messages();
        for (i, msg) in messages.iter().enumerate() {
            if msg.role != Role::Tool {
                continue;
            }
            // Walk back over preceding tool messages to the assistant turn.
            let mut j = i;
            while j > 0 && messages[j - 1].role == Role::Tool {
                j -= 1;
            }
            assert!(j > 0, "tool message with no preceding assistant message");
            let assistant = &messages[j - 1];
            assert_eq!(assistant.role, Role::Assistant);
            assert!(
                !assistant.tool_calls.is_empty(),
                "assistant message carries no directives"
            );
        }
    }

    #[tokio::test]
    async fn test_not_connected_returns_message() {
        let session = MockSession {
            connected: false,
            ..MockSession::connected()
        };
        let orch = orchestrator(MockProvider::new(false), session);

        let mut conv = Conversation::new();
        let answer = orch.process_query(&mut conv, "weather?").await;
        assert!(answer.contains("Not connected"));
        assert!(conv.is_empty());
    }

    #[tokio::test]
    async fn test_bounded_recursion_two_invocations_max() {
        let provider = MockProvider::new(true);
        let orch = orchestrator(provider, MockSession::connected());

        let mut conv = Conversation::new();
        orch.process_query(&mut conv, "alerts for CA?").await;

        // user, assistant(directives), tool, assistant(final); no third
        // completion even though the mock always emits directives.
        assert_eq!(conv.len(), 4);
        let assistant_turns = conv
            .messages()
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();
        assert_eq!(assistant_turns, 2);
        assert_tool_messages_follow_directives(&conv);
    }

    #[tokio::test]
    async fn test_provider_called_exactly_twice() {
        let provider = Arc::new(MockProvider::new(true));
        let session = Arc::new(MockSession::connected());
        let orch = Orchestrator::new(
            provider.clone(),
            session.clone(),
            GenerationOptions::default(),
        );

        let mut conv = Conversation::new();
        orch.process_query(&mut conv, "alerts?").await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tool_failure_appended_not_fatal() {
        let session = Arc::new(MockSession::failing());
        let orch = Orchestrator::new(
            Arc::new(MockProvider::new(true)),
            session.clone(),
            GenerationOptions::default(),
        );

        let mut conv = Conversation::new();
        let answer = orch.process_query(&mut conv, "alerts?").await;

        // The loop still produced a final answer after the tool error.
        assert_eq!(answer, "Let me check.");
        let tool_msg = conv
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .expect("tool message missing");
        assert!(tool_msg.content.contains("Error executing tool get-alerts"));
        assert_tool_messages_follow_directives(&conv);
    }

    #[tokio::test]
    async fn test_no_directives_single_invocation() {
        let provider = Arc::new(MockProvider::new(false));
        let orch = Orchestrator::new(
            provider.clone(),
            Arc::new(MockSession::connected()),
            GenerationOptions::default(),
        );

        let mut conv = Conversation::new();
        let answer = orch.process_query(&mut conv, "hello").await;

        assert_eq!(answer, "Let me check.");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(conv.len(), 2); // user, assistant
    }

    #[tokio::test]
    async fn test_tool_result_carries_correlation_id() {
        let orch = orchestrator(MockProvider::new(true), MockSession::connected());

        let mut conv = Conversation::new();
        orch.process_query(&mut conv, "alerts?").await;

        let tool_msg = conv
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call-1"));
    }
}
