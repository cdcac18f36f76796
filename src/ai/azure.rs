//! Azure OpenAI chat completions
//! (`POST {endpoint}/{deployment}/chat/completions?api-version={v}`, `api-key` header).
//!
//! TLS certificate verification toward Azure is disabled for this client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::provider::{
    ChatMessage, ChatProvider, CompletionResult, build_http_client, log_outbound,
    send_chat_request,
};
use crate::core::config::{AzureSettings, GptVendor, ProxyConfig};
use crate::core::system_parameters::{
    AZURE_GPT_DEPLOYMENT, AZURE_GPT_VERSION, ParameterStore, resolve_parameter,
};
use crate::errors::GptError;

pub struct AzureOpenAiProvider {
    http: Client,
    settings: AzureSettings,
    parameters: Arc<dyn ParameterStore>,
}

impl AzureOpenAiProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        settings: AzureSettings,
        proxy: Option<&ProxyConfig>,
        timeout: Option<Duration>,
        parameters: Arc<dyn ParameterStore>,
    ) -> Result<Self, GptError> {
        Ok(Self {
            http: build_http_client(proxy, timeout, true)?,
            settings,
            parameters,
        })
    }

    /// # Errors
    ///
    /// Returns `GptError::ConfigError` if neither the override nor the environment value is set.
    pub async fn resolve_deployment(&self) -> Result<String, GptError> {
        resolve_parameter(
            self.parameters.as_ref(),
            AZURE_GPT_DEPLOYMENT,
            self.settings.deployment.as_deref(),
        )
        .await
        .ok_or_else(|| {
            GptError::ConfigError(
                "neither the AzureGptDeployment system parameter nor AZURE_OPENAI_API_DEPLOYMENT is set"
                    .to_string(),
            )
        })
    }

    /// # Errors
    ///
    /// Returns `GptError::ConfigError` if neither the override nor the environment value is set.
    pub async fn resolve_api_version(&self) -> Result<String, GptError> {
        resolve_parameter(
            self.parameters.as_ref(),
            AZURE_GPT_VERSION,
            self.settings.api_version.as_deref(),
        )
        .await
        .ok_or_else(|| {
            GptError::ConfigError(
                "neither the AzureGptVersion system parameter nor AZURE_OPENAI_API_VERSION is set"
                    .to_string(),
            )
        })
    }

    /// # Errors
    ///
    /// Returns `GptError::ConfigError` if the endpoint does not form a valid URL.
    pub fn completions_url(&self, deployment: &str, api_version: &str) -> Result<Url, GptError> {
        let raw = format!(
            "{}/{}/chat/completions",
            self.settings.endpoint.trim_end_matches('/'),
            deployment
        );
        let mut url = Url::parse(&raw).map_err(|e| {
            GptError::ConfigError(format!("Invalid Azure OpenAI endpoint ({raw}): {e}"))
        })?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }
}

#[async_trait]
impl ChatProvider for AzureOpenAiProvider {
    fn vendor(&self) -> GptVendor {
        GptVendor::Azure
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResult, GptError> {
        let deployment = self.resolve_deployment().await?;
        let api_version = self.resolve_api_version().await?;
        let url = self.completions_url(&deployment, &api_version)?;
        log_outbound(GptVendor::Azure, &deployment, messages);

        let request = self
            .http
            .post(url)
            .header("api-key", &self.settings.api_key)
            .json(&json!({ "messages": messages }));

        send_chat_request(request, GptVendor::Azure).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::system_parameters::InMemoryParameterStore;

    fn provider(endpoint: &str) -> AzureOpenAiProvider {
        AzureOpenAiProvider::new(
            AzureSettings {
                endpoint: endpoint.to_string(),
                api_key: "azure-key".to_string(),
                deployment: Some("env-deployment".to_string()),
                api_version: Some("2023-05-15".to_string()),
            },
            None,
            None,
            Arc::new(InMemoryParameterStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_completions_url_carries_api_version() {
        let url = provider("https://res.openai.azure.com/openai/deployments/")
            .completions_url("gpt4", "2024-02-01")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://res.openai.azure.com/openai/deployments/gpt4/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn test_completions_url_rejects_invalid_endpoint() {
        let err = provider("not a url").completions_url("gpt4", "v").unwrap_err();
        assert!(matches!(err, GptError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_environment_values_used_without_overrides() {
        let p = provider("https://res.openai.azure.com/openai/deployments");
        assert_eq!(p.resolve_deployment().await.unwrap(), "env-deployment");
        assert_eq!(p.resolve_api_version().await.unwrap(), "2023-05-15");
    }
}
