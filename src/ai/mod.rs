//! All AI/LLM functionality

pub mod azure;
pub mod interpreter;
pub mod openai;
pub mod prompt_builder;
pub mod provider;

// Re-export main types for convenience
pub use interpreter::{InterpretedResponse, Proposal, ResponseShape, interpret, interpret_for};
pub use prompt_builder::{ComposedPrompt, compose};
pub use provider::{ChatMessage, ChatProvider, CompletionResult, TokenUsage, build_provider};
