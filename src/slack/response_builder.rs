//! Payloads sent back through a slash command's `response_url` or as the
//! immediate HTTP reply.

use serde_json::{Value, json};

/// Message only the invoking user can see.
///
/// ```
/// use degul::slack::response_builder::create_ephemeral_payload;
///
/// let payload = create_ephemeral_payload("Starting topic relevance analysis...");
/// assert_eq!(payload["response_type"], "ephemeral");
/// ```
#[must_use]
pub fn create_ephemeral_payload(text: &str) -> Value {
    json!({
        "text": text,
        "response_type": "ephemeral"
    })
}

