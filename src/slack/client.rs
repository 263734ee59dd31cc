//! Slack API client module
//!
//! Encapsulates the Slack Web API methods the bot needs, with retry logic and
//! error handling. The base URL is configurable so tests can point the client
//! at a mock server.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use slack_morphism::{SlackApiToken, SlackApiTokenValue};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::core::config::DEFAULT_SLACK_API_BASE_URL;
use crate::core::models::Reaction;
use crate::errors::BotError;

/// Page size requested from `conversations.history`.
pub const HISTORY_PAGE_LIMIT: u16 = 200;

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// A raw message as returned by `conversations.history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    pub user: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub ts: String,
    pub subtype: Option<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

/// One page of channel history plus the cursor for the next one.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub messages: Vec<HistoryMessage>,
    /// Present only when Slack reports `has_more` and hands out a non-empty cursor.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
    #[serde(default)]
    has_more: bool,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersInfoResponse {
    ok: bool,
    error: Option<String>,
    user: Option<SlackUser>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    name: Option<String>,
    real_name: Option<String>,
    profile: Option<SlackUserProfile>,
}

#[derive(Debug, Deserialize)]
struct SlackUserProfile {
    display_name: Option<String>,
}

impl SlackUser {
    /// `display_name`, then `real_name`, then the handle.
    fn preferred_name(self) -> Option<String> {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        non_empty(self.profile.and_then(|p| p.display_name))
            .or_else(|| non_empty(self.real_name))
            .or_else(|| non_empty(self.name))
    }
}

/// Slack API client with retry logic and error handling
pub struct SlackClient {
    token: SlackApiToken,
    api_base: String,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, DEFAULT_SLACK_API_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(token: String, api_base: &str) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &SlackApiToken {
        &self.token
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// Retries transport-level failures only; Slack `ok: false` answers are final.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, BotError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, BotError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(50)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(4);

        RetryIf::spawn(strategy, operation, |e: &BotError| {
            matches!(e, BotError::HttpError(_))
        })
        .await
    }

    async fn read_body(method: &str, resp: reqwest::Response) -> Result<Value, BotError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(BotError::HttpError(format!("{method} HTTP {status}")));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| BotError::ApiError(format!("{method} JSON parse error: {e}")))
    }

    fn ensure_ok(method: &str, body: Value) -> Result<Value, BotError> {
        if body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            Ok(body)
        } else {
            Err(BotError::ApiError(format!(
                "{method} error: {}",
                body.get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
            )))
        }
    }

    /// POST a JSON payload to a Web API method and return the raw reply.
    async fn post_json(&self, method: &str, payload: &Value) -> Result<Value, BotError> {
        self.with_retry(|| async {
            let resp = HTTP_CLIENT
                .post(self.method_url(method))
                .bearer_auth(&self.token.token_value.0)
                .json(payload)
                .send()
                .await
                .map_err(|e| BotError::HttpError(format!("Failed to call {method}: {e}")))?;

            Self::read_body(method, resp).await
        })
        .await
    }

    /// POST form fields to a Web API method and return the raw reply.
    async fn post_form(&self, method: &str, form: &[(&str, String)]) -> Result<Value, BotError> {
        self.with_retry(|| async {
            let resp = HTTP_CLIENT
                .post(self.method_url(method))
                .bearer_auth(&self.token.token_value.0)
                .form(form)
                .send()
                .await
                .map_err(|e| BotError::HttpError(format!("Failed to call {method}: {e}")))?;

            Self::read_body(method, resp).await
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if `auth.test` fails or carries no `user_id`.
    pub async fn bot_user_id(&self) -> Result<String, BotError> {
        let body = Self::ensure_ok("auth.test", self.post_form("auth.test", &[]).await?)?;

        body.get("user_id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| BotError::ApiError("auth.test returned no user_id".to_string()))
    }

    /// Resolve a user id to the name shown in reports.
    ///
    /// Returns `Ok(None)` when Slack refuses the lookup (deleted user, missing
    /// scope); callers skip such users.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails.
    pub async fn user_display_name(&self, user_id: &str) -> Result<Option<String>, BotError> {
        let body = self
            .post_form("users.info", &[("user", user_id.to_string())])
            .await?;
        let info: UsersInfoResponse = serde_json::from_value(body)?;

        if !info.ok {
            warn!(
                "users.info refused for {}: {}",
                user_id,
                info.error.as_deref().unwrap_or("unknown")
            );
            return Ok(None);
        }

        Ok(info.user.and_then(SlackUser::preferred_name))
    }

    /// Fetch one page of channel history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or Slack answers `ok: false`.
    pub async fn history_page(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
        limit: u16,
    ) -> Result<HistoryPage, BotError> {
        let mut form = vec![
            ("channel", channel_id.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(c) = cursor {
            form.push(("cursor", c.to_string()));
        }

        let body = self.post_form("conversations.history", &form).await?;
        let resp: HistoryResponse = serde_json::from_value(body)?;

        if !resp.ok {
            return Err(BotError::ApiError(format!(
                "conversations.history error: {}",
                resp.error.as_deref().unwrap_or("unknown")
            )));
        }

        let next_cursor = if resp.has_more {
            resp.response_metadata
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty())
        } else {
            None
        };

        debug!(
            "conversations.history page for {}: {} messages, more={}",
            channel_id,
            resp.messages.len(),
            next_cursor.is_some()
        );

        Ok(HistoryPage {
            messages: resp.messages,
            next_cursor,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the Slack API request fails.
    pub async fn post_message(&self, channel_id: &str, message: &str) -> Result<(), BotError> {
        let payload = json!({
            "channel": channel_id,
            "text": message,
        });

        Self::ensure_ok(
            "chat.postMessage",
            self.post_json("chat.postMessage", &payload).await?,
        )?;
        Ok(())
    }

    /// Post a message with Block Kit `blocks`; `text_fallback` is what
    /// notifications and previews show.
    ///
    /// # Errors
    ///
    /// Returns an error if the Slack API request fails.
    pub async fn post_message_with_blocks(
        &self,
        channel_id: &str,
        text_fallback: &str,
        blocks: &Value,
    ) -> Result<(), BotError> {
        let payload = json!({
            "channel": channel_id,
            "text": text_fallback,
            "blocks": blocks,
        });

        Self::ensure_ok(
            "chat.postMessage",
            self.post_json("chat.postMessage", &payload).await?,
        )?;
        Ok(())
    }

    /// Upload a file and share it to a channel using the 3-step upload API.
    ///
    /// 1. `files.getUploadURLExternal` returns a pre-signed upload URL
    /// 2. POST raw bytes to the upload URL
    /// 3. `files.completeUploadExternal` finalizes and shares to the channel
    ///
    /// Requires the `files:write` scope. Returns the Slack file id.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three steps fails.
    pub async fn upload_file(
        &self,
        channel_id: &str,
        bytes: Vec<u8>,
        filename: &str,
        title: &str,
    ) -> Result<String, BotError> {
        let reserve = Self::ensure_ok(
            "files.getUploadURLExternal",
            self.post_form(
                "files.getUploadURLExternal",
                &[
                    ("filename", filename.to_string()),
                    ("length", bytes.len().to_string()),
                ],
            )
            .await?,
        )?;

        let upload_url = reserve
            .get("upload_url")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BotError::ApiError("files.getUploadURLExternal missing upload_url".to_string())
            })?
            .to_string();
        let file_id = reserve
            .get("file_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BotError::ApiError("files.getUploadURLExternal missing file_id".to_string())
            })?
            .to_string();

        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let resp = HTTP_CLIENT
            .post(&upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| BotError::HttpError(format!("Failed to upload file bytes: {e}")))?;

        if !resp.status().is_success() {
            return Err(BotError::ApiError(format!(
                "file upload POST failed: {}",
                resp.status()
            )));
        }

        let files = json!([{ "id": file_id, "title": title }]).to_string();
        Self::ensure_ok(
            "files.completeUploadExternal",
            self.post_form(
                "files.completeUploadExternal",
                &[("files", files), ("channel_id", channel_id.to_string())],
            )
            .await?,
        )?;

        info!("Uploaded {} ({}) to channel {}", filename, file_id, channel_id);
        Ok(file_id)
    }

    /// POST a payload to a slash-command `response_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Slack answers with a non-2xx status.
    pub async fn send_response_url(&self, response_url: &str, payload: &Value) -> Result<(), BotError> {
        let resp = HTTP_CLIENT.post(response_url).json(payload).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(BotError::HttpError(format!(
                "response_url POST failed: status={status} body={body_text}"
            )));
        }
        Ok(())
    }
}
