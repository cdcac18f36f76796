//! Polling of the retrieval agent's diagnostic log.
//!
//! The log is a plain text file written by the retrieval backend while a
//! retrieval-augmented completion runs. It may not exist yet when polling
//! starts; a missing file is not an error.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::core::models::RequestId;
use crate::errors::GptError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AgentLogPoller {
    http: Client,
    base_url: String,
    interval: Duration,
}

impl AgentLogPoller {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// # Errors
    ///
    /// Returns `GptError::ConfigError` if the base URL does not form a valid URL.
    pub fn log_url(&self, request_id: &RequestId) -> Result<Url, GptError> {
        let raw = format!(
            "{}/media/textfiles/output_log_{}.txt",
            self.base_url.trim_end_matches('/'),
            request_id
        );
        Url::parse(&raw)
            .map_err(|e| GptError::ConfigError(format!("Invalid agent log URL ({raw}): {e}")))
    }

    /// Fetch the current log. `Ok(None)` while the log does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a status other than success or 404.
    pub async fn fetch(&self, request_id: &RequestId) -> Result<Option<String>, GptError> {
        let url = self.log_url(request_id)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GptError::AgentLogError(format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(GptError::AgentLogError(format!(
                "request returned status {status}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| GptError::AgentLogError(format!("body unreadable: {e}")))?;
        Ok(Some(text))
    }

    /// Poll in the background until the returned watch is stopped or dropped.
    #[must_use]
    pub fn spawn(&self, request_id: RequestId) -> AgentLogWatch {
        let (sender, receiver) = watch::channel(None);
        let poller = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            loop {
                ticker.tick().await;
                match poller.fetch(&request_id).await {
                    Ok(Some(content)) => {
                        if sender.send(Some(content)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => debug!(request_id = %request_id, "Agent log not written yet"),
                    Err(e) => warn!(request_id = %request_id, "Agent log poll failed: {}", e),
                }
            }
        });

        AgentLogWatch { receiver, handle }
    }
}

/// Handle to a running poll. Polling stops when this is dropped.
#[derive(Debug)]
pub struct AgentLogWatch {
    receiver: watch::Receiver<Option<String>>,
    handle: JoinHandle<()>,
}

impl AgentLogWatch {
    #[must_use]
    pub fn latest(&self) -> Option<String> {
        self.receiver.borrow().clone()
    }

    /// Stop polling and return the last content seen.
    #[must_use]
    pub fn stop(self) -> Option<String> {
        self.handle.abort();
        self.latest()
    }
}

impl Drop for AgentLogWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
