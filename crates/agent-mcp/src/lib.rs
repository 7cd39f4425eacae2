//! Tool-invocation protocol
//!
//! JSON-RPC 2.0 framing with a small session lifecycle on top:
//!
//! ```text
//! uninitialized -> connecting -> ready -> closed
//! ```
//!
//! The server side ([`McpSession`]) binds a tool registry to a
//! transport; the client side ([`McpClient`]) speaks to a server over
//! HTTP and exposes the connection as an
//! [`agent_core::ToolSession`] for the orchestration loop.

pub mod client;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::McpClient;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
pub use session::{McpSession, SessionState};
pub use transport::serve_stdio;
