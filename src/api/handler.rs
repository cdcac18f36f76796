//! API Lambda handler - thin router over the dispatch and conversation routes.
//!
//! - `POST …/gpt`: compose and dispatch, return the provider's completion plus `totalPrompts`
//! - `POST …/conversation`: run a full orchestrated turn

use lambda_runtime::{Error, LambdaEvent};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

use super::{helpers, parsing};
use crate::ai::prompt_builder::compose;
use crate::ai::provider::{ChatProvider, build_provider};
use crate::conversation::{ConversationOrchestrator, TurnRequest};
use crate::core::config::AppConfig;
use crate::core::system_parameters::{ParameterStore, SsmParameterStore};
use crate::errors::GptError;
use crate::telemetry::agent_log::AgentLogPoller;
use crate::telemetry::usage::{SqsUsageSink, TracingUsageSink, UsageRecorder, UsageSink};

/// Long-lived collaborators shared across invocations.
pub struct ApiState {
    provider: Arc<dyn ChatProvider>,
    orchestrator: ConversationOrchestrator,
}

impl ApiState {
    #[must_use]
    pub fn new(provider: Arc<dyn ChatProvider>, orchestrator: ConversationOrchestrator) -> Self {
        Self {
            provider,
            orchestrator,
        }
    }

    /// # Errors
    ///
    /// Returns an error if configuration is incomplete or the provider cannot be built.
    pub async fn from_config(config: &AppConfig) -> Result<Self, GptError> {
        let parameters: Arc<dyn ParameterStore> =
            Arc::new(SsmParameterStore::from_env(config.system_parameter_prefix.clone()).await);
        let provider = build_provider(config, parameters)?;

        let sink: Arc<dyn UsageSink> = match &config.usage_queue_url {
            Some(queue_url) => Arc::new(SqsUsageSink::from_env(queue_url.clone()).await),
            None => Arc::new(TracingUsageSink),
        };

        let mut orchestrator =
            ConversationOrchestrator::new(Arc::clone(&provider), UsageRecorder::new(sink));
        if let Some(base_url) = &config.agent_log_base_url {
            orchestrator = orchestrator.with_agent_log_poller(AgentLogPoller::new(base_url.clone()));
        }

        info!(vendor = %config.gpt_vendor, "API state initialised");
        Ok(Self::new(provider, orchestrator))
    }
}

/// Lambda entrypoint.
///
/// # Errors
///
/// Never fails at the Lambda level; request failures are returned as error responses.
#[tracing::instrument(level = "info", skip(state, event))]
pub async fn function_handler(state: &ApiState, event: LambdaEvent<Value>) -> Result<Value, Error> {
    Ok(handle_request(state, &event.payload).await)
}

pub async fn handle_request(state: &ApiState, payload: &Value) -> Value {
    let method = parsing::request_method(payload).unwrap_or("POST");
    if !method.eq_ignore_ascii_case("POST") {
        return helpers::err_response(405, "Method not allowed");
    }

    let body = match extract_body(payload) {
        Ok(b) => b,
        Err(response) => return response,
    };

    let path = parsing::request_path(payload).unwrap_or_default();
    info!(raw_path = %path, "Request path");

    if path.ends_with("/gpt") {
        return handle_dispatch(state, body).await;
    }

    if path.ends_with("/conversation") {
        return handle_conversation(state, payload, body).await;
    }

    helpers::err_response(404, "Not found")
}

async fn handle_dispatch(state: &ApiState, body: &str) -> Value {
    let dispatch: parsing::DispatchBody = match parsing::parse_json_body(body) {
        Ok(d) => d,
        Err(e) => {
            error!("Dispatch body parse error: {}", e);
            return helpers::error_for(&e);
        }
    };

    let composed = compose(
        &dispatch.request.prompts,
        dispatch.user_inputs.as_deref(),
        &dispatch.request.messages,
    );

    match state.provider.complete(&composed.messages).await {
        Ok(completion) => {
            let mut response = completion.raw;
            if let Value::Object(map) = &mut response {
                map.insert("totalPrompts".to_string(), composed.total_prompts_json());
            }
            helpers::ok_json(&response)
        }
        Err(e) => {
            error!("GPT request failed: {}", e);
            helpers::error_for(&e)
        }
    }
}

async fn handle_conversation(state: &ApiState, payload: &Value, body: &str) -> Value {
    let conversation: parsing::ConversationBody = match parsing::parse_json_body(body) {
        Ok(c) => c,
        Err(e) => {
            error!("Conversation body parse error: {}", e);
            return helpers::error_for(&e);
        }
    };

    let request = TurnRequest {
        endpoint: conversation.endpoint,
        history: conversation.messages,
        user_inputs: conversation.user_inputs,
        request_id: conversation.request_id,
        rag_file_name: conversation.rag_file_name,
        use_case: conversation.use_case,
        client_ip: parsing::client_ip(payload),
    };

    match state.orchestrator.run_turn(request).await {
        Ok(outcome) => helpers::ok_json(&json!({
            "response": outcome.response,
            "assistantMessage": outcome.assistant_turn(),
            "completion": outcome.completion.raw,
            "displayPrompts": outcome.display_prompts,
            "totalPrompts": outcome.total_prompts,
        })),
        Err(e) => helpers::error_for(&e),
    }
}

fn extract_body(payload: &Value) -> Result<&str, Value> {
    let Some(body) = payload.get("body") else {
        error!("Request missing body");
        return Err(helpers::err_response(400, "Missing body"));
    };

    let Some(body_str) = body.as_str() else {
        error!("Request body is not a string");
        return Err(helpers::err_response(400, "Invalid body format"));
    };

    Ok(body_str)
}
