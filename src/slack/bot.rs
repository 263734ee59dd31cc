use std::sync::Arc;
use tracing::{error, info, warn};

use super::client::SlackClient;
use super::history::fetch_chat_log;
use crate::ai::{Embedder, LanguageModel, WatsonxClient, WatsonxEmbeddings, WatsonxLlm};
use crate::charts;
use crate::core::config::AppConfig;
use crate::core::models::{AuthorFilter, ChatLog};
use crate::errors::BotError;

/// Slack access plus the models the analyses run on.
pub struct SlackBot {
    slack_client: SlackClient,
    topic_llm: Box<dyn LanguageModel>,
    contribution_llm: Box<dyn LanguageModel>,
    embedder: Box<dyn Embedder>,
}

impl SlackBot {
    /// Wire up the Slack client and the watsonx.ai models named in `config`.
    /// A configured chart font that fails to load is logged and charts are
    /// drawn without text.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let slack_client =
            SlackClient::with_base_url(config.slack_bot_token.clone(), &config.slack_api_base_url);
        let watsonx = Arc::new(WatsonxClient::from_config(config));

        if let Some(path) = &config.chart_font_path
            && let Err(e) = charts::register_font_file(path)
        {
            warn!("Chart font unavailable, charts will have no text: {}", e);
        }

        Self::with_models(
            slack_client,
            Box::new(WatsonxLlm::new(watsonx.clone(), config.topic_model_id.clone())),
            Box::new(WatsonxLlm::new(
                watsonx.clone(),
                config.contribution_model_id.clone(),
            )),
            Box::new(WatsonxEmbeddings::new(watsonx, config.embedding_model_id.clone())),
        )
    }

    #[must_use]
    pub fn with_models(
        slack_client: SlackClient,
        topic_llm: Box<dyn LanguageModel>,
        contribution_llm: Box<dyn LanguageModel>,
        embedder: Box<dyn Embedder>,
    ) -> Self {
        Self {
            slack_client,
            topic_llm,
            contribution_llm,
            embedder,
        }
    }

    #[must_use]
    pub fn slack_client(&self) -> &SlackClient {
        &self.slack_client
    }

    #[must_use]
    pub fn topic_llm(&self) -> &dyn LanguageModel {
        self.topic_llm.as_ref()
    }

    #[must_use]
    pub fn contribution_llm(&self) -> &dyn LanguageModel {
        self.contribution_llm.as_ref()
    }

    #[must_use]
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Human messages of a channel, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if any Slack call fails.
    pub async fn chat_log(&self, channel_id: &str) -> Result<Vec<ChatLog>, BotError> {
        fetch_chat_log(&self.slack_client, channel_id, AuthorFilter::Users).await
    }

    /// # Errors
    ///
    /// Returns an error if the Slack API call fails.
    pub async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), BotError> {
        match self.slack_client.post_message(channel_id, text).await {
            Ok(()) => {
                info!("Posted message to channel {}", channel_id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to post message to {}: {}", channel_id, e);
                Err(e)
            }
        }
    }
}
