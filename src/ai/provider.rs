//! Provider-neutral chat completion types and HTTP plumbing.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::azure::AzureOpenAiProvider;
use super::openai::OpenAiProvider;
use crate::core::config::{AppConfig, GptVendor, ProxyConfig};
use crate::core::models::{ConversationTurn, Role};
use crate::core::system_parameters::ParameterStore;
use crate::errors::GptError;

/// A message as sent on the wire to either provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role.into(),
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Normalized provider response. `raw` is the body exactly as the provider sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub model: String,
    pub content: String,
    pub usage: TokenUsage,
    pub agent_logs: Option<String>,
    pub raw: Value,
}

impl CompletionResult {
    /// # Errors
    ///
    /// Returns `GptError::ProviderError` when the body carries no first choice message.
    pub fn from_value(raw: Value) -> Result<Self, GptError> {
        let content = raw
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| {
                GptError::ProviderError("completion has no choices[0].message.content".to_string())
            })?;

        let model = raw
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();

        let usage = raw
            .get("usage")
            .cloned()
            .and_then(|u| serde_json::from_value::<TokenUsage>(u).ok())
            .unwrap_or_default();

        let agent_logs = raw
            .get("agentLogs")
            .and_then(|l| l.as_str())
            .map(ToString::to_string);

        Ok(Self {
            model,
            content,
            usage,
            agent_logs,
            raw,
        })
    }
}

/// One of the two chat-completion backends.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn vendor(&self) -> GptVendor;

    /// # Errors
    ///
    /// Returns `GptError::ProviderError` on network failure, a non-success
    /// status, or an unusable response body, and `GptError::ConfigError` when
    /// no model/deployment can be resolved.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResult, GptError>;
}

/// Select the provider configured for this deployment.
///
/// # Errors
///
/// Returns an error if the selected vendor's settings are missing or the HTTP
/// client cannot be built.
pub fn build_provider(
    config: &AppConfig,
    parameters: Arc<dyn ParameterStore>,
) -> Result<Arc<dyn ChatProvider>, GptError> {
    match config.gpt_vendor {
        GptVendor::OpenAi => {
            let settings = config.openai.clone().ok_or_else(|| {
                GptError::ConfigError("OpenAI settings are missing".to_string())
            })?;
            let provider = OpenAiProvider::new(
                settings,
                config.proxy.as_ref(),
                config.request_timeout,
                parameters,
            )?;
            Ok(Arc::new(provider))
        }
        GptVendor::Azure => {
            let settings = config.azure.clone().ok_or_else(|| {
                GptError::ConfigError("Azure OpenAI settings are missing".to_string())
            })?;
            let provider = AzureOpenAiProvider::new(
                settings,
                config.proxy.as_ref(),
                config.request_timeout,
                parameters,
            )?;
            Ok(Arc::new(provider))
        }
    }
}

/// Build the outbound HTTP client. Environment proxies are ignored unless
/// `proxy` is given.
///
/// # Errors
///
/// Returns `GptError::HttpError` if the proxy URL is invalid or the client cannot be built.
pub fn build_http_client(
    proxy: Option<&ProxyConfig>,
    timeout: Option<Duration>,
    accept_invalid_certs: bool,
) -> Result<Client, GptError> {
    let mut builder = Client::builder();

    builder = match proxy {
        Some(proxy) => {
            let proxy = reqwest::Proxy::all(proxy.url())
                .map_err(|e| GptError::HttpError(format!("Invalid proxy URL: {e}")))?;
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    if accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| GptError::HttpError(format!("Failed to build provider HTTP client: {e}")))
}

pub(crate) fn log_outbound(vendor: GptVendor, model: &str, messages: &[ChatMessage]) {
    #[cfg(feature = "debug-logs")]
    info!(vendor = %vendor, model = %model, "Using prompt:\n{:?}", messages);

    #[cfg(not(feature = "debug-logs"))]
    info!(
        vendor = %vendor,
        model = %model,
        "Requesting completion with {} messages in prompt",
        messages.len()
    );
}

/// Send a prepared chat completion request and normalize the response.
///
/// # Errors
///
/// Returns `GptError::ProviderError` for transport failures, non-success
/// statuses and bodies that are not a chat completion.
pub(crate) async fn send_chat_request(
    request: RequestBuilder,
    vendor: GptVendor,
) -> Result<CompletionResult, GptError> {
    let response = request.send().await.map_err(|e| {
        error!(vendor = %vendor, "Provider request failed: {}", e);
        GptError::ProviderError(format!("{vendor} request failed: {e}"))
    })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_else(|e| {
            format!("Failed to read error response body (status {status}): {e}")
        });
        error!(vendor = %vendor, status = %status, "Provider returned an error: {}", error_text);
        return Err(GptError::ProviderError(format!(
            "{vendor} API error (status {status}): {error_text}"
        )));
    }

    let response_json: Value = response.json().await.map_err(|e| {
        GptError::ProviderError(format!("Failed to parse {vendor} response: {e}"))
    })?;

    let result = CompletionResult::from_value(response_json)?;
    info!(
        vendor = %vendor,
        model = %result.model,
        total_tokens = result.usage.total_tokens,
        "Completion received"
    );
    Ok(result)
}
