#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;

use prompt_console::ai::provider::{ChatMessage, ChatProvider, CompletionResult};
use prompt_console::core::config::GptVendor;
use prompt_console::core::models::{EndpointConfig, EndpointType, PromptSet};
use prompt_console::errors::GptError;
use prompt_console::telemetry::usage::{UsageRecord, UsageSink};

/// Replies with a fixed content, or fails, and remembers every prompt it was sent.
pub struct ScriptedProvider {
    reply: Option<String>,
    delay: Duration,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn replying(content: &str) -> Self {
        Self {
            reply: Some(content.to_string()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn last_call(&self) -> Vec<ChatMessage> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn vendor(&self) -> GptVendor {
        GptVendor::OpenAi
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResult, GptError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.reply {
            Some(content) => CompletionResult::from_value(json!({
                "model": "gpt-4o-mini",
                "choices": [{ "message": { "role": "assistant", "content": content } }],
                "usage": { "prompt_tokens": 40, "completion_tokens": 10, "total_tokens": 50 }
            })),
            None => Err(GptError::ProviderError(
                "OPENAI API error (status 503): unavailable".to_string(),
            )),
        }
    }
}

#[derive(Default)]
pub struct CapturingSink {
    pub records: Mutex<Vec<UsageRecord>>,
}

impl CapturingSink {
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageSink for CapturingSink {
    async fn submit(&self, record: &UsageRecord) -> Result<(), GptError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub fn endpoint(endpoint_type: EndpointType) -> EndpointConfig {
    EndpointConfig {
        name: "Career consultation".to_string(),
        description: None,
        url: "/api/private/gpt".to_string(),
        endpoint_type,
        use_rag: false,
        prompts: PromptSet {
            primary_prompt: Some("Answer as JSON.".to_string()),
            primary_prompt_description: Some("System prompt".to_string()),
            ..PromptSet::default()
        },
    }
}
