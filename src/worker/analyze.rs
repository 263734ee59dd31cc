//! Runs the requested analysis and lays out what should be posted, in order.

use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::{
    ContributionAnalyzer, ParticipationMetric, TopicRelevanceAnalyzer, analyze_participation,
};
use crate::charts;
use crate::core::config::AppConfig;
use crate::core::models::{AnalysisKind, AnalysisTask, ChatLog};
use crate::errors::BotError;
use crate::slack::SlackBot;
use crate::slack::blocks;

pub const NO_MESSAGES_NOTICE: &str =
    "There are no messages to analyse in this channel yet. Chat a little and try again!";
pub const NO_TEXT_NOTICE: &str =
    "There are no text messages to analyse in this channel yet. Chat a little and try again!";
pub const NO_EVALUATIONS_NOTICE: &str =
    "I couldn't rate any of the messages for the contribution analysis. Please try again later.";

/// A rendered chart waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct ChartUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub title: String,
}

/// One message or file to send to the channel.
#[derive(Debug, Clone)]
pub enum DeliveryStep {
    Blocks { text: String, blocks: Value },
    Notice(String),
    Chart(ChartUpload),
}

/// Everything to post for a finished analysis, in posting order.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub steps: Vec<DeliveryStep>,
}

impl AnalysisOutcome {
    fn notice(text: &str) -> Self {
        Self {
            steps: vec![DeliveryStep::Notice(text.to_string())],
        }
    }

    #[must_use]
    pub fn charts(&self) -> impl Iterator<Item = &ChartUpload> {
        self.steps.iter().filter_map(|s| match s {
            DeliveryStep::Chart(c) => Some(c),
            _ => None,
        })
    }
}

/// Why an analysis could not be delivered. Each kind maps to a channel message.
#[derive(Debug)]
pub enum AnalysisFailure {
    ChatLog(BotError),
    SlackApi(BotError),
    Analysis(BotError),
}

impl AnalysisFailure {
    #[must_use]
    pub fn user_message(&self, kind: AnalysisKind) -> String {
        match self {
            Self::ChatLog(_) => {
                "Oops! Something went wrong while fetching the chat log.".to_string()
            }
            Self::SlackApi(_) => "Oops! A Slack API error occurred.".to_string(),
            Self::Analysis(_) => format!(
                "Oops! Something went wrong during the {} analysis.",
                kind.label()
            ),
        }
    }

    #[must_use]
    pub fn error(&self) -> &BotError {
        match self {
            Self::ChatLog(e) | Self::SlackApi(e) | Self::Analysis(e) => e,
        }
    }
}

fn chart(bytes: Vec<u8>, filename: &str, title: &str) -> DeliveryStep {
    DeliveryStep::Chart(ChartUpload {
        bytes,
        filename: filename.to_string(),
        title: title.to_string(),
    })
}

fn failed(e: BotError) -> AnalysisFailure {
    if e.is_slack_api() {
        AnalysisFailure::SlackApi(e)
    } else {
        AnalysisFailure::Analysis(e)
    }
}

/// Fetch the channel's chat log and run `task.kind` over it.
///
/// # Errors
///
/// Returns the failure kind that decides which message the channel gets.
pub async fn run_analysis(
    bot: &SlackBot,
    config: &AppConfig,
    task: &AnalysisTask,
) -> Result<AnalysisOutcome, AnalysisFailure> {
    let logs = bot
        .chat_log(&task.channel_id)
        .await
        .map_err(AnalysisFailure::ChatLog)?;

    if logs.is_empty() {
        info!(correlation_id = %task.correlation_id, "Channel has no messages to analyse");
        return Ok(AnalysisOutcome::notice(NO_MESSAGES_NOTICE));
    }

    analyze_logs(bot, config, task.kind, &logs)
        .await
        .map_err(failed)
}

/// Run one analysis over an already fetched chat log.
///
/// # Errors
///
/// Returns an error if a model call or chart rendering fails.
pub async fn analyze_logs(
    bot: &SlackBot,
    config: &AppConfig,
    kind: AnalysisKind,
    logs: &[ChatLog],
) -> Result<AnalysisOutcome, BotError> {
    // Topic and contribution work on message text only.
    if !kind.is_participation() && logs.iter().all(|log| log.text.trim().is_empty()) {
        info!("No text messages for {:?}", kind);
        return Ok(AnalysisOutcome::notice(NO_TEXT_NOTICE));
    }

    let steps = match kind {
        AnalysisKind::SpeechAmount | AnalysisKind::MessageCount | AnalysisKind::ReactionCount => {
            let metric = ParticipationMetric::from_kind(kind).ok_or_else(|| {
                BotError::AnalysisError(format!("{kind:?} is not a participation metric"))
            })?;
            let report = analyze_participation(logs, metric);
            let title = match metric {
                ParticipationMetric::SpeechAmount => "Speech amount analysis results",
                ParticipationMetric::MessageCount => "Message count analysis results",
                ParticipationMetric::ReactionCount => "Reaction count analysis results",
            };

            let mut steps = Vec::with_capacity(2);
            if report.total > 0 {
                steps.push(chart(
                    charts::participation_pie(&report)?,
                    "participation_analysis.png",
                    title,
                ));
            } else {
                warn!("Nothing to chart for {:?}", metric);
            }
            steps.push(DeliveryStep::Blocks {
                text: "Here are the participation analysis results!".to_string(),
                blocks: blocks::participation_blocks(&report, config.report_timezone),
            });
            steps
        }
        AnalysisKind::TopicRelevance => {
            let report = TopicRelevanceAnalyzer::new(bot.topic_llm(), bot.embedder())
                .analyze(logs)
                .await?;
            vec![
                DeliveryStep::Blocks {
                    text: "Here are the topic relevance analysis results!".to_string(),
                    blocks: blocks::topic_relevance_blocks(&report),
                },
                chart(
                    charts::similarity_histogram(&report.scores, report.threshold.value)?,
                    "similarity_distribution.png",
                    "Similarity distribution",
                ),
                chart(
                    charts::relevance_bar(&report)?,
                    "topic_relevance_analysis.png",
                    "Topic relevance analysis results",
                ),
            ]
        }
        AnalysisKind::Contribution => {
            let report = ContributionAnalyzer::new(bot.contribution_llm())
                .analyze(logs)
                .await;
            if report.is_empty() {
                return Ok(AnalysisOutcome::notice(NO_EVALUATIONS_NOTICE));
            }
            vec![
                chart(
                    charts::contribution_bars(&report)?,
                    "contribution_analysis.png",
                    "Meeting contribution analysis results",
                ),
                DeliveryStep::Blocks {
                    text: "Here are the meeting contribution analysis results!".to_string(),
                    blocks: blocks::contribution_blocks(&report),
                },
            ]
        }
    };

    Ok(AnalysisOutcome { steps })
}
