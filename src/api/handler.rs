//! API Lambda handler - thin router that delegates to specialized handlers.
//!
//! This module handles:
//! - Request validation (headers, body, signature)
//! - Events API requests (delegated to `event_handler`)
//! - Slash commands (delegated to `slash_handler`)

use super::sqs::{SqsQueue, TaskQueue};
use super::{event_handler, helpers, parsing, signature, slash_handler};
use crate::core::config::AppConfig;
use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

pub use self::function_handler as handler;

/// Lambda handler for the API entrypoint.
///
/// # Errors
///
/// Fails only when the configuration cannot be loaded; request problems are
/// answered with an error response.
#[tracing::instrument(level = "info", skip(event))]
pub async fn function_handler(event: LambdaEvent<Value>) -> Result<impl Serialize, Error> {
    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;

    let queue = SqsQueue::new(&config);
    Ok(handle_request(&config, &queue, &event.payload).await)
}

/// Validate and route one API Gateway request.
pub async fn handle_request(config: &AppConfig, queue: &dyn TaskQueue, payload: &Value) -> Value {
    let Some(headers) = payload.get("headers") else {
        error!("Request missing headers");
        return helpers::err_response(400, "Missing headers");
    };

    let path = parsing::request_path(payload);
    if let Some(path) = path {
        info!(raw_path = %path, "Request path");
    }

    let body = match parsing::request_body(payload) {
        Ok(b) => b,
        Err(e) => {
            error!("Invalid request body: {}", e);
            return helpers::err_response(400, &e.to_string());
        }
    };

    if let Err(response) = verify_signature(&body, headers, config) {
        return response;
    }
    info!("Slack signature verified successfully");

    // Events API requests are JSON; slash commands are form-encoded.
    if let Ok(json_body) = serde_json::from_str::<Value>(&body)
        && json_body.is_object()
    {
        return event_handler::handle_event_callback(&json_body);
    }

    match slash_handler::handle_slash_command(config, queue, &body, path).await {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to parse Slack event: {}", e);
            helpers::err_response(400, &format!("Parse Error: {e}"))
        }
    }
}

fn verify_signature(body: &str, headers: &Value, config: &AppConfig) -> Result<(), Value> {
    let Some(sig) = parsing::get_header_value(headers, "X-Slack-Signature") else {
        error!("Missing X-Slack-Signature header");
        return Err(helpers::err_response(
            401,
            "Missing X-Slack-Signature header",
        ));
    };

    let Some(timestamp) = parsing::get_header_value(headers, "X-Slack-Request-Timestamp") else {
        error!("Missing X-Slack-Request-Timestamp header");
        return Err(helpers::err_response(
            401,
            "Missing X-Slack-Request-Timestamp header",
        ));
    };

    if !signature::verify_slack_signature(body, timestamp, sig, &config.slack_signing_secret) {
        error!("Slack signature verification failed");
        return Err(helpers::err_response(401, "Invalid Slack signature"));
    }

    Ok(())
}
