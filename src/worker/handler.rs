use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use super::analyze::{AnalysisFailure, run_analysis};
use super::deliver::{deliver_outcome, notify_failure};
use crate::core::config::AppConfig;
use crate::core::models::AnalysisTask;
use crate::errors::BotError;
use crate::slack::SlackBot;

/// Pull the task out of the first SQS record.
///
/// # Errors
///
/// Returns `ParseError` if the event has no record body or the body is not a task.
pub fn parse_task(payload: &Value) -> Result<AnalysisTask, BotError> {
    let body = payload
        .get("Records")
        .and_then(|records| records.as_array())
        .and_then(|records| records.first())
        .and_then(|record| record.get("body"))
        .and_then(|body| body.as_str())
        .ok_or_else(|| BotError::ParseError("Failed to extract SQS message body".to_string()))?;

    serde_json::from_str(body).map_err(|e| {
        BotError::ParseError(format!(
            "Failed to parse SQS message body into AnalysisTask: {}",
            e
        ))
    })
}

/// Analyse and deliver one task. Failures are reported to the channel rather
/// than returned, so the message is not redelivered.
///
/// # Errors
///
/// Returns an error only when the failure could not be reported either.
pub async fn process_task(
    slack_bot: &SlackBot,
    config: &AppConfig,
    task: &AnalysisTask,
) -> Result<(), BotError> {
    let failure = match run_analysis(slack_bot, config, task).await {
        Ok(outcome) => match deliver_outcome(slack_bot, task, outcome).await {
            Ok(()) => return Ok(()),
            Err(e) => AnalysisFailure::SlackApi(e),
        },
        Err(failure) => failure,
    };
    notify_failure(slack_bot, task, &failure).await
}

/// Lambda handler for the Worker entrypoint. Parses the SQS message, runs the
/// analysis and posts the results.
#[tracing::instrument(level = "info", skip(event))]
pub async fn function_handler(event: LambdaEvent<Value>) -> Result<(), Error> {
    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;

    let task = parse_task(&event.payload).map_err(|e| {
        error!("{}", e);
        Error::from(e.to_string())
    })?;
    info!(
        correlation_id = %task.correlation_id,
        channel_id = %task.channel_id,
        kind = ?task.kind,
        "Worker picked up analysis task"
    );

    let slack_bot = SlackBot::new(&config);
    process_task(&slack_bot, &config, &task)
        .await
        .map_err(|e| Error::from(format!("Delivery error: {}", e)))
}

pub use self::function_handler as handler;
