//! Slash commands: the greeting is answered inline, analyses are queued for
//! the worker.

use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::helpers::{err_response, ok_empty, ok_ephemeral, post_blocks_with_timeout};
use super::parsing::parse_slack_event;
use super::sqs::TaskQueue;
use crate::core::config::AppConfig;
use crate::core::models::AnalysisTask;
use crate::errors::BotError;
use crate::slack::blocks::{GREETING_FALLBACK, greeting_blocks};
use crate::slack::command_parser::BotCommand;

/// How long the ack waits for the greeting post.
const GREETING_POST_TIMEOUT_MS: u64 = 1500;

pub const UNKNOWN_COMMAND_MESSAGE: &str = "Command not recognized";

/// Handle a slash command from Slack.
///
/// `path` is the request path; per-command endpoints resolve the command when
/// its name is not one the bot knows.
///
/// # Errors
///
/// Returns an error if the body cannot be parsed.
pub async fn handle_slash_command(
    config: &AppConfig,
    queue: &dyn TaskQueue,
    body: &str,
    path: Option<&str>,
) -> Result<Value, BotError> {
    let slack_event = parse_slack_event(body)?;
    info!(
        command = %slack_event.command,
        channel_id = %slack_event.channel_id,
        user_id = %slack_event.user_id,
        "Slash command received"
    );

    if slack_event.channel_id.is_empty() {
        warn!("Slash command without channel_id");
        return Ok(err_response(400, "Channel ID not found"));
    }

    let Some(command) = BotCommand::resolve(&slack_event.command, path) else {
        warn!("Unrecognized command {:?}", slack_event.command);
        return Ok(err_response(404, UNKNOWN_COMMAND_MESSAGE));
    };

    match command {
        BotCommand::Greeting => {
            post_blocks_with_timeout(
                config,
                &slack_event.channel_id,
                GREETING_FALLBACK,
                &greeting_blocks(),
                GREETING_POST_TIMEOUT_MS,
            )
            .await;
            Ok(ok_empty())
        }
        BotCommand::Analyze(kind) => {
            let task = AnalysisTask {
                correlation_id: Uuid::new_v4().to_string(),
                user_id: slack_event.user_id.clone(),
                channel_id: slack_event.channel_id.clone(),
                response_url: Some(slack_event.response_url.clone()).filter(|u| !u.is_empty()),
                kind,
            };

            if let Err(e) = queue.enqueue(&task).await {
                error!(correlation_id = %task.correlation_id, "Failed to enqueue task: {}", e);
                return Ok(ok_ephemeral(&format!(
                    "Sorry, I couldn't start the {} analysis. Please try again.",
                    kind.label()
                )));
            }

            info!(correlation_id = %task.correlation_id, kind = ?kind, "Analysis queued");
            Ok(ok_ephemeral(&format!(
                "Starting {} analysis... results will be posted to this channel.",
                kind.label()
            )))
        }
    }
}
