use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use tracing::info;

use crate::core::{config::AppConfig, models::AnalysisTask};
use crate::errors::BotError;

/// Where queued analyses go; the worker Lambda consumes them.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: &AnalysisTask) -> Result<(), BotError>;
}

/// Queue backed by the configured SQS queue.
pub struct SqsQueue<'a> {
    config: &'a AppConfig,
}

impl<'a> SqsQueue<'a> {
    #[must_use]
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TaskQueue for SqsQueue<'_> {
    async fn enqueue(&self, task: &AnalysisTask) -> Result<(), BotError> {
        send_to_sqs(task, self.config).await
    }
}

/// # Errors
///
/// Returns an error if no queue is configured, serialization fails, or the
/// message cannot be sent to SQS.
pub async fn send_to_sqs(task: &AnalysisTask, config: &AppConfig) -> Result<(), BotError> {
    let queue_url = config.processing_queue_url.trim();
    if queue_url.is_empty() {
        return Err(BotError::AwsError(
            "PROCESSING_QUEUE_URL is not set".to_string(),
        ));
    }
    let shared_config = aws_config::from_env().load().await;
    let client = SqsClient::new(&shared_config);
    let message_body = serde_json::to_string(task)
        .map_err(|e| BotError::ParseError(format!("Failed to serialize task: {e}")))?;

    client
        .send_message()
        .queue_url(queue_url)
        .message_body(message_body)
        .send()
        .await
        .map_err(|e| BotError::AwsError(format!("Failed to send message to SQS: {e}")))?;

    info!(
        correlation_id = %task.correlation_id,
        kind = ?task.kind,
        "Queued analysis task"
    );
    Ok(())
}
