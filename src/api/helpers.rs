//! Response builders and the fire-and-forget Slack post used by handlers.

use serde_json::{Value, json};
use std::time::Duration;
use tracing::error;

use crate::core::config::AppConfig;
use crate::slack::SlackClient;

/// Returns a 200 OK response with an empty body.
#[must_use]
pub fn ok_empty() -> Value {
    json!({ "statusCode": 200, "body": "" })
}

/// Returns a 200 OK response with an ephemeral Slack message.
#[must_use]
pub fn ok_ephemeral(text: &str) -> Value {
    json!({
        "statusCode": 200,
        "headers": { "Content-Type": "application/json" },
        "body": crate::slack::response_builder::create_ephemeral_payload(text).to_string()
    })
}

/// Returns a 200 OK response with a plain body.
#[must_use]
pub fn ok_text(body: &str) -> Value {
    json!({ "statusCode": 200, "body": body })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "body": json!({ "error": message }).to_string()
    })
}

/// 404 that tells Slack not to retry the delivery.
#[must_use]
pub fn not_found_no_retry(message: &str) -> Value {
    json!({
        "statusCode": 404,
        "headers": { "X-Slack-No-Retry": "1" },
        "body": message
    })
}

/// Posts a message with blocks to a channel, waiting at most `timeout_ms`.
///
/// Keeps the Slack ack fast; the post continues in the background if the
/// timeout fires.
pub async fn post_blocks_with_timeout(
    config: &AppConfig,
    channel_id: &str,
    text: &str,
    blocks: &Value,
    timeout_ms: u64,
) {
    let client = SlackClient::with_base_url(config.slack_bot_token.clone(), &config.slack_api_base_url);
    let channel_id = channel_id.to_string();
    let text = text.to_string();
    let blocks = blocks.clone();

    let handle = tokio::spawn(async move {
        if let Err(e) = client
            .post_message_with_blocks(&channel_id, &text, &blocks)
            .await
        {
            error!("Failed to post blocks to {}: {}", channel_id, e);
        }
    });

    let _ = tokio::time::timeout(Duration::from_millis(timeout_ms), handle).await;
}
