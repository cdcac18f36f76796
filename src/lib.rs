/// Prompt console - the prompt/response orchestration layer of an internal LLM admin console.
///
/// Staff configure prompt templates ("endpoints") and run multi-turn
/// conversations against one of two chat-completion providers. This crate:
/// 1. Composes the outbound prompt from an endpoint's prompt fragments and the conversation
/// 2. Dispatches it to OpenAI or Azure OpenAI, with operator overrides read on every call
/// 3. Classifies the model's JSON reply (answer, interview, consultation)
/// 4. Records token usage and latency for every completion
///
/// # Architecture
///
/// The system uses:
/// - AWS Lambda for the inbound dispatch API
/// - SSM Parameter Store for operator-editable provider overrides
/// - SQS for usage telemetry delivery
/// - reqwest for the provider HTTP calls
/// - Tokio for async runtime
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use prompt_console::ai::provider::build_provider;
/// use prompt_console::conversation::{ConversationOrchestrator, TurnRequest};
/// use prompt_console::core::config::AppConfig;
/// use prompt_console::core::models::{ConversationTurn, EndpointConfig, EndpointType, PromptSet};
/// use prompt_console::core::system_parameters::InMemoryParameterStore;
/// use prompt_console::telemetry::UsageRecorder;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     prompt_console::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let provider = build_provider(&config, Arc::new(InMemoryParameterStore::new()))?;
///     let orchestrator = ConversationOrchestrator::new(provider, UsageRecorder::default());
///
///     let endpoint = EndpointConfig {
///         name: "Career consultation".to_string(),
///         description: None,
///         url: "/api/private/gpt".to_string(),
///         endpoint_type: EndpointType::Consultation,
///         use_rag: false,
///         prompts: PromptSet {
///             primary_prompt: Some("Reply as {\"answer\": ..., \"proposals\": [...]}".to_string()),
///             ..PromptSet::default()
///         },
///     };
///
///     let outcome = orchestrator
///         .run_turn(TurnRequest::new(
///             endpoint,
///             vec![ConversationTurn::user("I like drawing.")],
///         ))
///         .await?;
///     println!("{}", outcome.response.display_text());
///
///     Ok(())
/// }
/// ```
// Module declarations
pub mod ai;
pub mod api;
pub mod conversation;
pub mod core;
pub mod errors;
pub mod telemetry;

pub use errors::GptError;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// The level comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// prompt_console::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
