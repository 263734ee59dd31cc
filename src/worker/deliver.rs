use tracing::{error, info};

use super::analyze::{AnalysisFailure, AnalysisOutcome, DeliveryStep};
use crate::core::models::AnalysisTask;
use crate::errors::BotError;
use crate::slack::SlackBot;
use crate::slack::response_builder::create_ephemeral_payload;

/// Post every step of `outcome` to the task's channel, in order.
///
/// # Errors
///
/// Stops at and returns the first Slack error.
pub async fn deliver_outcome(
    slack_bot: &SlackBot,
    task: &AnalysisTask,
    outcome: AnalysisOutcome,
) -> Result<(), BotError> {
    let client = slack_bot.slack_client();
    for step in outcome.steps {
        match step {
            DeliveryStep::Blocks { text, blocks } => {
                client
                    .post_message_with_blocks(&task.channel_id, &text, &blocks)
                    .await?;
            }
            DeliveryStep::Notice(text) => {
                client.post_message(&task.channel_id, &text).await?;
            }
            DeliveryStep::Chart(upload) => {
                client
                    .upload_file(&task.channel_id, upload.bytes, &upload.filename, &upload.title)
                    .await?;
            }
        }
    }

    info!(
        correlation_id = %task.correlation_id,
        channel_id = %task.channel_id,
        "Delivered {:?} analysis",
        task.kind
    );
    Ok(())
}

/// Tell the channel the analysis failed. Falls back to the slash command's
/// `response_url` when the channel post itself fails.
///
/// # Errors
///
/// Returns an error only if both the channel post and the fallback fail.
pub async fn notify_failure(
    slack_bot: &SlackBot,
    task: &AnalysisTask,
    failure: &AnalysisFailure,
) -> Result<(), BotError> {
    error!(
        correlation_id = %task.correlation_id,
        "{:?} analysis failed: {}",
        task.kind,
        failure.error()
    );

    let message = failure.user_message(task.kind);
    let Err(post_err) = slack_bot.send_message(&task.channel_id, &message).await else {
        return Ok(());
    };

    let Some(response_url) = task.response_url.as_deref() else {
        return Err(post_err);
    };

    slack_bot
        .slack_client()
        .send_response_url(response_url, &create_ephemeral_payload(&message))
        .await
        .map_err(|e| {
            error!("response_url fallback failed: {}", e);
            e
        })
}
