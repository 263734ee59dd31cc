//! Events API requests. Only the URL verification handshake is answered;
//! the bot subscribes to no events.

use serde_json::Value;
use tracing::info;

use super::helpers::{not_found_no_retry, ok_text};

pub const NO_EVENTS_MESSAGE: &str = "There are no slack request events";

#[must_use]
pub fn handle_event_callback(json_body: &Value) -> Value {
    if json_body.get("type").and_then(Value::as_str) == Some("url_verification") {
        let challenge = json_body
            .get("challenge")
            .and_then(Value::as_str)
            .unwrap_or("");
        info!("Answering url_verification challenge");
        return ok_text(challenge);
    }

    not_found_no_retry(NO_EVENTS_MESSAGE)
}
