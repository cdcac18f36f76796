//! Operator-editable overrides for provider settings.
//!
//! Values are looked up on every provider call so that a model, deployment or
//! API version change takes effect without a redeploy.

use async_trait::async_trait;
use aws_sdk_ssm::Client as SsmClient;
use aws_sdk_ssm::error::DisplayErrorContext;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::GptError;

pub const OPENAI_MODEL_NAME: &str = "OpenAiModelName";
pub const AZURE_GPT_DEPLOYMENT: &str = "AzureGptDeployment";
pub const AZURE_GPT_VERSION: &str = "AzureGptVersion";

#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, GptError>;
}

/// Resolve a setting: a stored non-empty value wins, otherwise `fallback`.
///
/// Store failures are logged and fall back to the static value.
pub async fn resolve_parameter(
    store: &dyn ParameterStore,
    key: &str,
    fallback: Option<&str>,
) -> Option<String> {
    match store.get(key).await {
        Ok(Some(value)) if !value.trim().is_empty() => {
            debug!(parameter = key, "Using system parameter override");
            Some(value)
        }
        Ok(_) => fallback.map(ToString::to_string),
        Err(e) => {
            warn!(parameter = key, error = %e, "System parameter lookup failed, using environment value");
            fallback.map(ToString::to_string)
        }
    }
}

fn key_for_parameter(prefix: &str, key: &str) -> String {
    let mut p = prefix.to_string();
    if !p.ends_with('/') {
        p.push('/');
    }
    format!("{p}{key}")
}

/// SSM Parameter Store backed overrides.
pub struct SsmParameterStore {
    client: SsmClient,
    prefix: String,
}

impl SsmParameterStore {
    #[must_use]
    pub fn new(client: SsmClient, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    pub async fn from_env(prefix: impl Into<String>) -> Self {
        let shared = aws_config::from_env().load().await;
        Self::new(SsmClient::new(&shared), prefix)
    }

    #[must_use]
    pub fn parameter_name(&self, key: &str) -> String {
        key_for_parameter(&self.prefix, key)
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GptError> {
        let name = self.parameter_name(key);

        match self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
        {
            Ok(resp) => Ok(resp
                .parameter
                .and_then(|param| param.value)
                .filter(|value| !value.is_empty())),
            Err(e) => {
                let msg = format!("{}", DisplayErrorContext(&e));
                if msg.contains("ParameterNotFound") {
                    Ok(None)
                } else {
                    Err(GptError::ParameterStoreError(format!(
                        "ssm get_parameter: {msg}"
                    )))
                }
            }
        }
    }
}

/// Process-local overrides, written by an administrator path and read by providers.
#[derive(Default)]
pub struct InMemoryParameterStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryParameterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(map),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut guard = match self.values.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        let mut guard = match self.values.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.remove(key);
    }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GptError> {
        let guard = self
            .values
            .read()
            .map_err(|e| GptError::ParameterStoreError(format!("lock poisoned: {e}")))?;
        Ok(guard.get(key).cloned())
    }
}
