//! Per-completion usage telemetry.

use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use aws_sdk_sqs::error::DisplayErrorContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::ai::provider::CompletionResult;
use crate::core::config::GptVendor;
use crate::errors::GptError;

/// One row per completion call. Field names follow the usage log store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub gpt_vendor: GptVendor,
    pub gpt_model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub prompt: String,
    pub total_prompts: String,
    pub response: String,
    pub use_case: String,
    pub api_endpoint_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Milliseconds between `started_at` and `ended_at`.
    pub response_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

/// Caller-side context of a completion call.
#[derive(Debug, Clone)]
pub struct UsageEntry {
    pub vendor: GptVendor,
    pub use_case: String,
    pub api_endpoint_name: String,
    /// The serialized request as the caller sent it.
    pub prompt: String,
    /// The prompts actually used, serialized for audit.
    pub total_prompts: String,
    pub started_at: DateTime<Utc>,
    pub client_ip: Option<String>,
}

/// Milliseconds from `started_at` to `ended_at`, zero if the clock went backwards.
#[must_use]
pub fn response_time_ms(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> u64 {
    u64::try_from((ended_at - started_at).num_milliseconds()).unwrap_or(0)
}

impl UsageRecord {
    #[must_use]
    pub fn new(entry: UsageEntry, completion: &CompletionResult, ended_at: DateTime<Utc>) -> Self {
        Self {
            gpt_vendor: entry.vendor,
            gpt_model: completion.model.clone(),
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            total_tokens: completion.usage.total_tokens,
            prompt: entry.prompt,
            total_prompts: entry.total_prompts,
            response: completion.content.clone(),
            use_case: entry.use_case,
            api_endpoint_name: entry.api_endpoint_name,
            started_at: entry.started_at,
            ended_at,
            response_time: response_time_ms(entry.started_at, ended_at),
            client_ip: entry.client_ip,
        }
    }
}

#[async_trait]
pub trait UsageSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `GptError::TelemetryError` if the record could not be stored.
    async fn submit(&self, record: &UsageRecord) -> Result<(), GptError>;
}

/// Writes usage records as structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingUsageSink;

#[async_trait]
impl UsageSink for TracingUsageSink {
    async fn submit(&self, record: &UsageRecord) -> Result<(), GptError> {
        info!(
            gpt_vendor = %record.gpt_vendor,
            gpt_model = %record.gpt_model,
            prompt_tokens = record.prompt_tokens,
            completion_tokens = record.completion_tokens,
            total_tokens = record.total_tokens,
            use_case = %record.use_case,
            api_endpoint_name = %record.api_endpoint_name,
            response_time_ms = record.response_time,
            client_ip = record.client_ip.as_deref().unwrap_or(""),
            "Completion usage"
        );
        Ok(())
    }
}

/// Queues usage records on SQS for the telemetry store.
pub struct SqsUsageSink {
    client: SqsClient,
    queue_url: String,
}

impl SqsUsageSink {
    #[must_use]
    pub fn new(client: SqsClient, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    pub async fn from_env(queue_url: impl Into<String>) -> Self {
        let shared_config = aws_config::from_env().load().await;
        Self::new(SqsClient::new(&shared_config), queue_url)
    }
}

#[async_trait]
impl UsageSink for SqsUsageSink {
    async fn submit(&self, record: &UsageRecord) -> Result<(), GptError> {
        let message_body = serde_json::to_string(record)
            .map_err(|e| GptError::TelemetryError(format!("Failed to serialize usage: {e}")))?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message_body)
            .send()
            .await
            .map_err(|e| {
                GptError::TelemetryError(format!(
                    "Failed to send usage record to SQS: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

/// Builds and submits one `UsageRecord` per completion. Submission failures
/// are logged and never reach the caller.
#[derive(Clone)]
pub struct UsageRecorder {
    sink: Arc<dyn UsageSink>,
}

impl UsageRecorder {
    #[must_use]
    pub fn new(sink: Arc<dyn UsageSink>) -> Self {
        Self { sink }
    }

    /// Stamp the end time, submit the record and return it.
    pub async fn record(&self, entry: UsageEntry, completion: &CompletionResult) -> UsageRecord {
        let record = UsageRecord::new(entry, completion, Utc::now());
        if let Err(e) = self.sink.submit(&record).await {
            error!(
                use_case = %record.use_case,
                api_endpoint_name = %record.api_endpoint_name,
                "Failed to record usage: {}",
                e
            );
        }
        record
    }

    /// Fire-and-forget variant of [`UsageRecorder::record`].
    pub fn record_in_background(
        &self,
        entry: UsageEntry,
        completion: CompletionResult,
    ) -> JoinHandle<()> {
        let recorder = self.clone();
        tokio::spawn(async move {
            recorder.record(entry, &completion).await;
        })
    }
}

impl Default for UsageRecorder {
    fn default() -> Self {
        Self::new(Arc::new(TracingUsageSink))
    }
}
