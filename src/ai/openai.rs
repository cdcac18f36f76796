//! OpenAI chat completions (`POST {base}/chat/completions`, bearer auth).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::provider::{
    ChatMessage, ChatProvider, CompletionResult, build_http_client, log_outbound,
    send_chat_request,
};
use crate::core::config::{GptVendor, OpenAiSettings, ProxyConfig};
use crate::core::system_parameters::{OPENAI_MODEL_NAME, ParameterStore, resolve_parameter};
use crate::errors::GptError;

pub struct OpenAiProvider {
    http: Client,
    settings: OpenAiSettings,
    parameters: Arc<dyn ParameterStore>,
}

impl OpenAiProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        settings: OpenAiSettings,
        proxy: Option<&ProxyConfig>,
        timeout: Option<Duration>,
        parameters: Arc<dyn ParameterStore>,
    ) -> Result<Self, GptError> {
        Ok(Self {
            http: build_http_client(proxy, timeout, false)?,
            settings,
            parameters,
        })
    }

    /// Model for the next call: the `OpenAiModelName` override, else `OPENAI_API_MODEL_NAME`.
    ///
    /// # Errors
    ///
    /// Returns `GptError::ConfigError` if neither is set.
    pub async fn resolve_model(&self) -> Result<String, GptError> {
        resolve_parameter(
            self.parameters.as_ref(),
            OPENAI_MODEL_NAME,
            self.settings.model_name.as_deref(),
        )
        .await
        .ok_or_else(|| {
            GptError::ConfigError(
                "neither the OpenAiModelName system parameter nor OPENAI_API_MODEL_NAME is set"
                    .to_string(),
            )
        })
    }

    #[must_use]
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn vendor(&self) -> GptVendor {
        GptVendor::OpenAi
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResult, GptError> {
        let model = self.resolve_model().await?;
        log_outbound(GptVendor::OpenAi, &model, messages);

        let request_body = json!({
            "model": model,
            "messages": messages,
        });

        let request = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.settings.api_key)
            .json(&request_body);

        send_chat_request(request, GptVendor::OpenAi).await
    }
}
