use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

use crate::errors::GptError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SYSTEM_PARAMETER_PREFIX: &str = "/prompt-console/system-parameters/";

/// Deployment-wide provider selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GptVendor {
    OpenAi,
    Azure,
}

impl GptVendor {
    /// Anything other than `AZURE` selects OpenAI.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("AZURE") => GptVendor::Azure,
            _ => GptVendor::OpenAi,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GptVendor::OpenAi => "OPENAI",
            GptVendor::Azure => "AZURE",
        }
    }
}

impl fmt::Display for GptVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl ProxyConfig {
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AzureSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: Option<String>,
    pub api_version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gpt_vendor: GptVendor,
    pub openai: Option<OpenAiSettings>,
    pub azure: Option<AzureSettings>,
    pub proxy: Option<ProxyConfig>,
    pub request_timeout: Option<Duration>,
    pub system_parameter_prefix: String,
    pub usage_queue_url: Option<String>,
    pub agent_log_base_url: Option<String>,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `GptError::ConfigError` naming the first missing or invalid variable.
    pub fn from_env() -> Result<Self, GptError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `GptError::ConfigError` naming the first missing or invalid variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GptError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| GptError::ConfigError(format!("{key} is not set")))
        };

        let gpt_vendor = GptVendor::parse(get("GPT_VENDOR").as_deref());

        let openai = match gpt_vendor {
            GptVendor::OpenAi => Some(OpenAiSettings {
                api_key: require("OPENAI_API_KEY")?,
                base_url: get("OPENAI_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model_name: get("OPENAI_API_MODEL_NAME"),
            }),
            GptVendor::Azure => None,
        };

        let azure = match gpt_vendor {
            GptVendor::Azure => Some(AzureSettings {
                endpoint: require("AZURE_OPENAI_API_ENDPOINT")?,
                api_key: require("AZURE_OPENAI_API_KEY")?,
                deployment: get("AZURE_OPENAI_API_DEPLOYMENT"),
                api_version: get("AZURE_OPENAI_API_VERSION"),
            }),
            GptVendor::OpenAi => None,
        };

        let use_proxy = get("USE_PROXY").is_some_and(|v| v.trim() == "true");
        let proxy = if use_proxy {
            let port_raw = require("PROXY_PORT")?;
            let port = port_raw.trim().parse::<u16>().map_err(|e| {
                GptError::ConfigError(format!("PROXY_PORT is not a valid port ({port_raw}): {e}"))
            })?;
            Some(ProxyConfig {
                host: require("PROXY_HOST")?,
                port,
            })
        } else {
            None
        };

        let request_timeout = match get("GPT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    GptError::ConfigError(format!("GPT_REQUEST_TIMEOUT_SECS ({raw}): {e}"))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            gpt_vendor,
            openai,
            azure,
            proxy,
            request_timeout,
            system_parameter_prefix: get("SYSTEM_PARAMETER_PREFIX")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PARAMETER_PREFIX.to_string()),
            usage_queue_url: get("USAGE_QUEUE_URL"),
            agent_log_base_url: get("AGENT_LOG_BASE_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_openai() {
        let config = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.gpt_vendor, GptVendor::OpenAi);
        let openai = config.openai.unwrap();
        assert_eq!(openai.base_url, DEFAULT_OPENAI_BASE_URL);
        assert!(openai.model_name.is_none());
        assert!(config.azure.is_none());
        assert!(config.proxy.is_none());
        assert!(config.request_timeout.is_none());
        assert_eq!(config.system_parameter_prefix, DEFAULT_SYSTEM_PARAMETER_PREFIX);
    }

    #[test]
    fn test_azure_requires_endpoint_and_key() {
        let err = AppConfig::from_lookup(lookup_from(&[("GPT_VENDOR", "AZURE")])).unwrap_err();
        assert!(err.to_string().contains("AZURE_OPENAI_API_ENDPOINT"));

        let config = AppConfig::from_lookup(lookup_from(&[
            ("GPT_VENDOR", "AZURE"),
            ("AZURE_OPENAI_API_ENDPOINT", "https://example.openai.azure.com/openai/deployments"),
            ("AZURE_OPENAI_API_KEY", "azure-key"),
            ("AZURE_OPENAI_API_VERSION", "2024-02-01"),
        ]))
        .unwrap();
        let azure = config.azure.unwrap();
        assert_eq!(azure.api_version.as_deref(), Some("2024-02-01"));
        assert!(azure.deployment.is_none());
    }

    #[test]
    fn test_proxy_enabled_only_with_true() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("USE_PROXY", "yes"),
        ]))
        .unwrap();
        assert!(config.proxy.is_none());

        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("USE_PROXY", "true"),
            ("PROXY_HOST", "proxy.internal"),
            ("PROXY_PORT", "3128"),
        ]))
        .unwrap();
        assert_eq!(config.proxy.unwrap().url(), "http://proxy.internal:3128");
    }

    #[test]
    fn test_invalid_proxy_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("USE_PROXY", "true"),
            ("PROXY_HOST", "proxy.internal"),
            ("PROXY_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(matches!(err, GptError::ConfigError(_)));
    }
}
