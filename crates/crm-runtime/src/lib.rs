//! # crm-runtime
//!
//! Concrete language-model providers for the CRM assistant.
//!
//! ## Providers
//!
//! - **Ollama** (default): any host speaking the Ollama `/api/chat` protocol,
//!   local or hosted
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crm_runtime::OllamaProvider;
//!
//! let provider = OllamaProvider::from_env()?;
//! let runner = FlowRunner::new(Arc::new(provider), options);
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use crm_core::{AgentError, GenerationOptions, LlmProvider, Message, Result, Role};
