//! # agent-core
//!
//! Core agent logic: conversation model, schema-validated tool
//! registry, provider-agnostic LLM abstraction, and the orchestration
//! loop that bridges the two.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Orchestrator                             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐   │
//! │  │  LlmProvider │  │  ToolSession │  │   Conversation    │   │
//! │  │  (Strategy)  │──│  (Protocol)  │──│   (append-only)   │   │
//! │  └──────────────┘  └──────────────┘  └───────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping completion backends, and
//! the `ToolSession` trait decouples the loop from the transport the
//! tool protocol runs over (HTTP request/response or a local pipe).

pub mod error;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use orchestrator::{Orchestrator, ToolSession};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use tool::{ContentBlock, ContentEnvelope, Tool, ToolCall, ToolDescriptor, ToolRegistry};
