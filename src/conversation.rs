//! Drives one conversation turn: compose, dispatch, interpret, record.
//!
//! Turns are independent; nothing is kept between calls. A dispatch failure
//! ends the turn without a usage record. An interpretation failure still
//! records usage for the completion that was paid for.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::ai::interpreter::{InterpretedResponse, Proposal, interpret_for};
use crate::ai::prompt_builder::{compose, proposal_detail_request};
use crate::ai::provider::{ChatProvider, CompletionResult};
use crate::core::models::{
    CompletionRequest, ConversationTurn, EndpointConfig, PromptSet, RequestId,
};
use crate::errors::GptError;
use crate::telemetry::agent_log::{AgentLogPoller, AgentLogWatch};
use crate::telemetry::usage::{UsageEntry, UsageRecorder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Compose,
    Dispatch,
    Interpret,
    Record,
    Done,
    Failed,
}

fn advance(state: &mut TurnState, next: TurnState) {
    debug!(from = ?*state, to = ?next, "Turn state");
    *state = next;
}

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub endpoint: EndpointConfig,
    /// Prior turns plus the new user message, oldest first.
    pub history: Vec<ConversationTurn>,
    pub user_inputs: Option<String>,
    pub request_id: Option<RequestId>,
    pub rag_file_name: Option<String>,
    /// Telemetry label; defaults to the endpoint type's label.
    pub use_case: Option<String>,
    pub client_ip: Option<String>,
}

impl TurnRequest {
    #[must_use]
    pub fn new(endpoint: EndpointConfig, history: Vec<ConversationTurn>) -> Self {
        Self {
            endpoint,
            history,
            user_inputs: None,
            request_id: None,
            rag_file_name: None,
            use_case: None,
            client_ip: None,
        }
    }

    fn completion_request(&self) -> CompletionRequest {
        let prompts = &self.endpoint.prompts;
        CompletionRequest {
            request_id: self.request_id.clone(),
            messages: self.history.clone(),
            prompts: PromptSet {
                primary_prompt: prompts.primary_prompt.clone(),
                secondary_prompt: prompts.secondary_prompt.clone(),
                tertiary_prompt: prompts.tertiary_prompt.clone(),
                quaternary_prompt: prompts.quaternary_prompt.clone(),
                quinary_prompt: prompts.quinary_prompt.clone(),
                ..PromptSet::default()
            },
            rag_file_name: self.rag_file_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: InterpretedResponse,
    /// Raw completion, kept for audit display.
    pub completion: CompletionResult,
    pub display_prompts: BTreeMap<String, String>,
    pub total_prompts: Value,
}

impl TurnOutcome {
    /// The assistant turn to append to the conversation.
    #[must_use]
    pub fn assistant_turn(&self) -> ConversationTurn {
        ConversationTurn {
            agent_log: self.completion.agent_logs.clone(),
            ..ConversationTurn::assistant(self.completion.content.clone())
        }
    }
}

pub struct ConversationOrchestrator {
    provider: Arc<dyn ChatProvider>,
    recorder: UsageRecorder,
    agent_logs: Option<AgentLogPoller>,
}

impl ConversationOrchestrator {
    #[must_use]
    pub fn new(provider: Arc<dyn ChatProvider>, recorder: UsageRecorder) -> Self {
        Self {
            provider,
            recorder,
            agent_logs: None,
        }
    }

    /// Poll the retrieval log while retrieval-augmented turns are dispatched.
    #[must_use]
    pub fn with_agent_log_poller(mut self, poller: AgentLogPoller) -> Self {
        self.agent_logs = Some(poller);
        self
    }

    /// # Errors
    ///
    /// Returns the provider's error if dispatch fails, and
    /// `MalformedResponse`/`UnrecognizedResponseShape` if the reply does not
    /// fit the endpoint's contract.
    #[tracing::instrument(level = "info", skip(self, request), fields(endpoint = %request.endpoint.name))]
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome, GptError> {
        let mut state = TurnState::Compose;

        let composed = compose(
            &request.endpoint.prompts,
            request.user_inputs.as_deref(),
            &request.history,
        );
        let serialized_request = match serde_json::to_string(&request.completion_request()) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!("Failed to serialize request for usage record: {}", e);
                String::new()
            }
        };
        let total_prompts = composed.total_prompts_json();

        advance(&mut state, TurnState::Dispatch);
        let started_at = Utc::now();
        let watch = self.start_agent_log_watch(&request);
        let dispatched = self.provider.complete(&composed.messages).await;
        let polled_log = watch.and_then(AgentLogWatch::stop);

        let mut completion = match dispatched {
            Ok(completion) => completion,
            Err(e) => {
                advance(&mut state, TurnState::Failed);
                error!(vendor = %self.provider.vendor(), "Completion failed: {}", e);
                return Err(e);
            }
        };
        if completion.agent_logs.is_none() {
            completion.agent_logs = polled_log;
        }

        advance(&mut state, TurnState::Interpret);
        let interpreted = interpret_for(request.endpoint.endpoint_type, &completion.content);

        advance(&mut state, TurnState::Record);
        let entry = UsageEntry {
            vendor: self.provider.vendor(),
            use_case: request
                .use_case
                .clone()
                .unwrap_or_else(|| request.endpoint.endpoint_type.default_use_case().to_string()),
            api_endpoint_name: request.endpoint.name.clone(),
            prompt: serialized_request,
            total_prompts: total_prompts.to_string(),
            started_at,
            client_ip: request.client_ip.clone(),
        };
        let record = self.recorder.record(entry, &completion).await;

        match interpreted {
            Ok(response) => {
                advance(&mut state, TurnState::Done);
                info!(
                    shape = ?response.shape(),
                    response_time_ms = record.response_time,
                    "Turn completed"
                );
                Ok(TurnOutcome {
                    response,
                    completion,
                    display_prompts: composed.display_prompts,
                    total_prompts,
                })
            }
            Err(e) => {
                advance(&mut state, TurnState::Failed);
                warn!("Model reply rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Ask the model to expand `proposal` and return its `fullText`, if the reply carries one.
    ///
    /// # Errors
    ///
    /// Same as [`ConversationOrchestrator::run_turn`].
    pub async fn request_proposal_detail(
        &self,
        mut request: TurnRequest,
        proposal: &Proposal,
    ) -> Result<Option<String>, GptError> {
        request
            .history
            .push(ConversationTurn::user(proposal_detail_request(&proposal.title)));

        let outcome = self.run_turn(request).await?;
        Ok(match outcome.response {
            InterpretedResponse::ConsultationTurn { full_text, .. } => full_text,
            _ => None,
        })
    }

    fn start_agent_log_watch(&self, request: &TurnRequest) -> Option<AgentLogWatch> {
        let poller = self.agent_logs.as_ref()?;
        if !request.endpoint.use_rag {
            return None;
        }
        let request_id = request.request_id.clone()?;
        Some(poller.spawn(request_id))
    }
}
