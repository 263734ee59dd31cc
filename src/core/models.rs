use serde::{Deserialize, Serialize};
use slack_morphism::{SlackTs, SlackUserId};

/// Which analysis a slash command asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Characters written per member.
    SpeechAmount,
    /// Messages posted per member.
    MessageCount,
    /// Reactions received per member.
    ReactionCount,
    /// Share of each member's utterances that stay on the extracted topic.
    TopicRelevance,
    /// LLM-rated meeting contribution per member.
    Contribution,
}

impl AnalysisKind {
    /// Resolve a slash command name such as `/발화량` or `/speech`.
    #[must_use]
    pub fn from_command(command: &str) -> Option<Self> {
        match command.trim() {
            "/발화량" | "/speech" | "/participation_speech" => Some(Self::SpeechAmount),
            "/메시지수" | "/messages" | "/participation_message" => Some(Self::MessageCount),
            "/반응수" | "/reactions" | "/participation_reaction" => Some(Self::ReactionCount),
            "/주제유사도" | "/topic" | "/topic_relevance" => Some(Self::TopicRelevance),
            "/기여도" | "/contribution" | "/contribution_analysis" => Some(Self::Contribution),
            _ => None,
        }
    }

    /// Resolve a per-command request path, e.g. `/prod/participation_speech`.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let last = path.trim_end_matches('/').rsplit('/').next()?;
        match last {
            "participation_speech" => Some(Self::SpeechAmount),
            "participation_message" => Some(Self::MessageCount),
            "participation_reaction" => Some(Self::ReactionCount),
            "topic_relevance" => Some(Self::TopicRelevance),
            "contribution_analysis" => Some(Self::Contribution),
            _ => None,
        }
    }

    /// Human readable analysis name used in acknowledgements and errors.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SpeechAmount => "speech amount",
            Self::MessageCount => "message count",
            Self::ReactionCount => "reaction count",
            Self::TopicRelevance => "topic relevance",
            Self::Contribution => "meeting contribution",
        }
    }

    #[must_use]
    pub fn is_participation(self) -> bool {
        matches!(
            self,
            Self::SpeechAmount | Self::MessageCount | Self::ReactionCount
        )
    }
}

/// Unit of work handed from the API function to the worker via SQS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisTask {
    pub correlation_id: String,
    pub user_id: String,
    pub channel_id: String,
    pub response_url: Option<String>,
    pub kind: AnalysisKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

/// One human utterance pulled from a channel, with its author resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatLog {
    pub user_id: SlackUserId,
    pub username: String,
    pub text: String,
    pub ts: SlackTs,
    pub reactions: Vec<Reaction>,
}

impl ChatLog {
    #[must_use]
    pub fn reaction_total(&self) -> u64 {
        self.reactions.iter().map(|r| r.count).sum()
    }

    /// Seconds since the epoch encoded in the Slack `ts` (`"1700000000.000100"`).
    #[must_use]
    pub fn epoch_seconds(&self) -> Option<f64> {
        self.ts.0.parse::<f64>().ok()
    }
}

/// Which authors to keep when collecting a chat log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthorFilter {
    /// Everyone except this bot.
    #[default]
    Users,
    /// Only this bot's own messages.
    Bot,
    All,
}

impl AuthorFilter {
    #[must_use]
    pub fn keeps(self, author: &str, bot_user_id: &str) -> bool {
        match self {
            AuthorFilter::Users => author != bot_user_id,
            AuthorFilter::Bot => author == bot_user_id,
            AuthorFilter::All => true,
        }
    }
}
