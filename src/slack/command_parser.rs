use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::models::AnalysisKind;

/// Fields Slack posts for a slash command invocation.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct SlackCommandEvent {
    pub team_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
}

/// What a slash command asks the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Greeting,
    Analyze(AnalysisKind),
}

impl BotCommand {
    /// Resolve from the command name, falling back to the request path
    /// (one endpoint per command).
    #[must_use]
    pub fn resolve(command: &str, path: Option<&str>) -> Option<Self> {
        match command.trim() {
            "/인사" | "/hello" => return Some(Self::Greeting),
            other => {
                if let Some(kind) = AnalysisKind::from_command(other) {
                    return Some(Self::Analyze(kind));
                }
            }
        }

        let path = path?;
        if path.trim_end_matches('/').ends_with("/hello") {
            return Some(Self::Greeting);
        }
        AnalysisKind::from_path(path).map(Self::Analyze)
    }
}

/// Decode one `application/x-www-form-urlencoded` component.
///
/// ```
/// use degul::slack::command_parser::decode_url_component;
///
/// assert_eq!(decode_url_component("hello%20world").unwrap(), "hello world");
/// assert_eq!(decode_url_component("a+b%2Bc").unwrap(), "a b+c");
/// ```
pub fn decode_url_component(input: &str) -> Result<String, String> {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| format!("Failed to decode URL component: {}", e))
}

/// Parse a slash command form body. Missing fields become empty strings.
///
/// ```
/// use degul::slack::command_parser::parse_form_data;
///
/// let body = "team_id=T1&channel_id=C1&user_id=U1&command=%2F%EB%B0%9C%ED%99%94%EB%9F%89\
///             &text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2F1";
/// let event = parse_form_data(body).unwrap();
/// assert_eq!(event.command, "/발화량");
/// assert_eq!(event.response_url, "https://hooks.slack.com/commands/1");
/// ```
pub fn parse_form_data(form_data: &str) -> Result<SlackCommandEvent, String> {
    let mut map: HashMap<String, String> = HashMap::new();

    for pair in form_data.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_url_component(key).map_err(|e| format!("Failed to decode key: {}", e))?;
        let value =
            decode_url_component(value).map_err(|e| format!("Failed to decode value: {}", e))?;
        map.insert(key, value);
    }

    let mut take = |k: &str| map.remove(k).unwrap_or_default();
    Ok(SlackCommandEvent {
        team_id: take("team_id"),
        channel_id: take("channel_id"),
        channel_name: take("channel_name"),
        user_id: take("user_id"),
        user_name: take("user_name"),
        command: take("command"),
        text: take("text"),
        response_url: take("response_url"),
        trigger_id: take("trigger_id"),
    })
}
