//! # agent-runtime
//!
//! Concrete runtime integrations for the core abstractions. Currently
//! one provider: Ollama, speaking its local REST chat API.

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};
