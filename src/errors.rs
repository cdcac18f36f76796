use thiserror::Error;

#[derive(Debug, Error)]
pub enum GptError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to read system parameter: {0}")]
    ParameterStoreError(String),

    #[error("Failed to get a completion from the LLM provider: {0}")]
    ProviderError(String),

    #[error("Model returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("Model returned an unrecognized response shape: {0}")]
    UnrecognizedResponseShape(String),

    #[error("Failed to record usage: {0}")]
    TelemetryError(String),

    #[error("Failed to fetch agent log: {0}")]
    AgentLogError(String),

    #[error("Failed to parse request: {0}")]
    ParseError(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpError(String),
}

impl GptError {
    /// True for failures the end user sees as a generic "request failed".
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            GptError::ProviderError(_)
                | GptError::MalformedResponse(_)
                | GptError::UnrecognizedResponseShape(_)
        )
    }
}

impl From<reqwest::Error> for GptError {
    fn from(error: reqwest::Error) -> Self {
        GptError::ProviderError(error.to_string())
    }
}
