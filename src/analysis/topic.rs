//! Topic relevance: how much of each member's talk stays on the meeting topic.

use std::collections::HashMap;
use tracing::info;

use super::clustering::{Threshold, relevance_threshold};
use super::similarity::{SimilarityStatistics, cosine_similarity};
use crate::ai::prompts::{
    MAX_TRANSCRIPT_TOKENS, fit_transcript, parse_topic_reply, topic_extraction_prompt,
    transcript_line,
};
use crate::ai::{Embedder, LanguageModel};
use crate::core::models::ChatLog;
use crate::errors::BotError;

/// A chat log with its position in the analysed transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedUtterance {
    pub index: usize,
    pub user_id: String,
    pub username: String,
    pub text: String,
}

impl IndexedUtterance {
    #[must_use]
    pub fn transcript_line(&self) -> String {
        transcript_line(self.index, &self.username, &self.text)
    }
}

/// Drop blank messages and number the rest in chronological order.
#[must_use]
pub fn index_utterances(logs: &[ChatLog]) -> Vec<IndexedUtterance> {
    logs.iter()
        .filter(|log| !log.text.trim().is_empty())
        .enumerate()
        .map(|(index, log)| IndexedUtterance {
            index,
            user_id: log.user_id.0.clone(),
            username: log.username.clone(),
            text: log.text.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRelevance {
    pub user_id: String,
    pub username: String,
    pub high_similarity_count: usize,
    pub message_count: usize,
    pub ratio: f64,
}

#[derive(Debug, Clone)]
pub struct TopicRelevanceReport {
    pub topic: String,
    /// Similarity of each utterance to the topic, in transcript order.
    pub scores: Vec<f64>,
    pub statistics: SimilarityStatistics,
    pub threshold: Threshold,
    /// Highest on-topic ratio first.
    pub users: Vec<UserRelevance>,
}

impl TopicRelevanceReport {
    #[must_use]
    pub fn mvp(&self) -> Option<&UserRelevance> {
        self.users.first()
    }
}

/// Count on-topic utterances per member. Ties keep first-seen order.
#[must_use]
pub fn relevance_by_user(
    utterances: &[IndexedUtterance],
    scores: &[f64],
    threshold: &Threshold,
) -> Vec<UserRelevance> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut users: Vec<UserRelevance> = Vec::new();

    for (utterance, &score) in utterances.iter().zip(scores) {
        let slot = *index.entry(utterance.user_id.as_str()).or_insert_with(|| {
            users.push(UserRelevance {
                user_id: utterance.user_id.clone(),
                username: utterance.username.clone(),
                high_similarity_count: 0,
                message_count: 0,
                ratio: 0.0,
            });
            users.len() - 1
        });

        let user = &mut users[slot];
        user.message_count += 1;
        if threshold.is_on_topic(score) {
            user.high_similarity_count += 1;
        }
    }

    for user in &mut users {
        user.ratio = user.high_similarity_count as f64 / user.message_count as f64;
    }
    users.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    users
}

/// Runs topic extraction, embedding and clustering over a chat log.
pub struct TopicRelevanceAnalyzer<'a> {
    llm: &'a dyn LanguageModel,
    embedder: &'a dyn Embedder,
}

impl<'a> TopicRelevanceAnalyzer<'a> {
    #[must_use]
    pub fn new(llm: &'a dyn LanguageModel, embedder: &'a dyn Embedder) -> Self {
        Self { llm, embedder }
    }

    /// Ask the model for the meeting topic.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails or the reply holds no topic.
    pub async fn extract_topic(&self, utterances: &[IndexedUtterance]) -> Result<String, BotError> {
        let lines: Vec<String> = utterances.iter().map(IndexedUtterance::transcript_line).collect();
        let transcript = fit_transcript(&lines, MAX_TRANSCRIPT_TOKENS);
        let reply = self.llm.generate(&topic_extraction_prompt(&transcript)).await?;

        parse_topic_reply(&reply)
            .ok_or_else(|| BotError::AnalysisError("model returned an empty topic".to_string()))
    }

    /// # Errors
    ///
    /// Returns an error when there is nothing to analyse, or when the model
    /// or embedding calls fail.
    pub async fn analyze(&self, logs: &[ChatLog]) -> Result<TopicRelevanceReport, BotError> {
        let utterances = index_utterances(logs);
        if utterances.is_empty() {
            return Err(BotError::AnalysisError(
                "no text messages to analyse".to_string(),
            ));
        }

        let topic = self.extract_topic(&utterances).await?;
        info!("Extracted topic: {}", topic);

        let topic_embedding = self
            .embedder
            .embed(std::slice::from_ref(&topic))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BotError::LlmError("no embedding for topic".to_string()))?;

        let texts: Vec<String> = utterances.iter().map(|u| u.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(BotError::LlmError(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let scores: Vec<f64> = embeddings
            .iter()
            .map(|e| cosine_similarity(&topic_embedding, e))
            .collect();

        let statistics = SimilarityStatistics::from_scores(&scores)
            .ok_or_else(|| BotError::AnalysisError("no similarity scores".to_string()))?;
        let threshold = relevance_threshold(&scores)
            .ok_or_else(|| BotError::AnalysisError("no similarity scores".to_string()))?;

        info!(
            max = statistics.max,
            min = statistics.min,
            mean = statistics.mean,
            median = statistics.median,
            std_dev = statistics.std_dev,
            threshold = threshold.value,
            "Similarity statistics"
        );

        let users = relevance_by_user(&utterances, &scores, &threshold);

        Ok(TopicRelevanceReport {
            topic,
            scores,
            statistics,
            threshold,
            users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Embedder, LanguageModel};
    use async_trait::async_trait;
    use slack_morphism::{SlackTs, SlackUserId};
    use std::sync::Mutex;

    struct FixedTopic(&'static str);

    #[async_trait]
    impl LanguageModel for FixedTopic {
        async fn generate(&self, _prompt: &str) -> Result<String, BotError> {
            Ok(self.0.to_string())
        }
    }

    /// Embeds "budget"-ish text near the topic axis and everything else orthogonal.
    struct KeywordEmbedder {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BotError> {
            *self.calls.lock().unwrap() += 1;
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("budget") || t.contains("Budget") {
                        vec![1.0, 0.1]
                    } else {
                        vec![0.1, 1.0]
                    }
                })
                .collect())
        }
    }

    fn log(user: &str, name: &str, text: &str) -> ChatLog {
        ChatLog {
            user_id: SlackUserId(user.into()),
            username: name.into(),
            text: text.into(),
            ts: SlackTs("1.0".into()),
            reactions: vec![],
        }
    }

    #[tokio::test]
    async fn test_analyze_ranks_users_by_on_topic_ratio() {
        let logs = vec![
            log("U1", "alice", "we need to cut the budget"),
            log("U2", "bob", "lunch anyone?"),
            log("U1", "alice", "budget review friday"),
            log("U2", "bob", "budget is fine"),
            log("U3", "carol", ""),
        ];
        let llm = FixedTopic("'Budget cuts' | notes");
        let embedder = KeywordEmbedder {
            calls: Mutex::new(0),
        };

        let report = TopicRelevanceAnalyzer::new(&llm, &embedder)
            .analyze(&logs)
            .await
            .unwrap();

        assert_eq!(report.topic, "Budget cuts");
        assert_eq!(report.scores.len(), 4);
        assert_eq!(*embedder.calls.lock().unwrap(), 2);
        assert_eq!(report.users.len(), 2);
        assert_eq!(report.mvp().map(|u| u.username.as_str()), Some("alice"));
        assert!((report.users[0].ratio - 1.0).abs() < 1e-12);
        assert_eq!(report.users[1].high_similarity_count, 1);
        assert_eq!(report.users[1].message_count, 2);
    }

    #[tokio::test]
    async fn test_analyze_rejects_blank_log() {
        let llm = FixedTopic("topic");
        let embedder = KeywordEmbedder {
            calls: Mutex::new(0),
        };
        let err = TopicRelevanceAnalyzer::new(&llm, &embedder)
            .analyze(&[log("U1", "alice", "   ")])
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::AnalysisError(_)));
    }

    #[tokio::test]
    async fn test_empty_topic_reply_is_an_error() {
        let llm = FixedTopic("  | ");
        let embedder = KeywordEmbedder {
            calls: Mutex::new(0),
        };
        let err = TopicRelevanceAnalyzer::new(&llm, &embedder)
            .analyze(&[log("U1", "alice", "hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::AnalysisError(_)));
        assert_eq!(*embedder.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_index_utterances_skips_blank_text() {
        let logs = vec![log("U1", "a", "x"), log("U2", "b", " "), log("U3", "c", "y")];
        let indexed = index_utterances(&logs);
        assert_eq!(indexed.len(), 2);
        assert_eq!(indexed[1].index, 1);
        assert_eq!(indexed[1].username, "c");
        assert_eq!(indexed[1].transcript_line(), "1: <@c>: y");
    }
}
