//! Per-member participation statistics over a chat log.

use std::collections::HashMap;

use crate::core::models::{AnalysisKind, ChatLog};

/// What a participation report counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationMetric {
    /// Characters written.
    SpeechAmount,
    MessageCount,
    /// Reactions received on the member's messages.
    ReactionCount,
}

impl ParticipationMetric {
    #[must_use]
    pub fn from_kind(kind: AnalysisKind) -> Option<Self> {
        match kind {
            AnalysisKind::SpeechAmount => Some(Self::SpeechAmount),
            AnalysisKind::MessageCount => Some(Self::MessageCount),
            AnalysisKind::ReactionCount => Some(Self::ReactionCount),
            _ => None,
        }
    }

    /// Contribution of a single message to this metric.
    #[must_use]
    pub fn measure(self, log: &ChatLog) -> u64 {
        match self {
            Self::SpeechAmount => log.text.chars().count() as u64,
            Self::MessageCount => 1,
            Self::ReactionCount => log.reaction_total(),
        }
    }

    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::SpeechAmount => "characters",
            Self::MessageCount => "messages",
            Self::ReactionCount => "reactions",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::SpeechAmount => "Speech amount share",
            Self::MessageCount => "Message count share",
            Self::ReactionCount => "Reaction count share",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantScore {
    pub user_id: String,
    pub username: String,
    pub value: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipationReport {
    pub metric: ParticipationMetric,
    /// Highest value first.
    pub entries: Vec<ParticipantScore>,
    pub total: u64,
    /// Oldest and newest message timestamps (epoch seconds).
    pub span: Option<(f64, f64)>,
}

impl ParticipationReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn mvp(&self) -> Option<&ParticipantScore> {
        self.entries.first()
    }

    #[must_use]
    pub fn average(&self) -> f64 {
        if self.entries.is_empty() {
            0.0
        } else {
            self.total as f64 / self.entries.len() as f64
        }
    }

    #[must_use]
    pub fn max(&self) -> u64 {
        self.entries.iter().map(|e| e.value).max().unwrap_or(0)
    }

    #[must_use]
    pub fn min(&self) -> u64 {
        self.entries.iter().map(|e| e.value).min().unwrap_or(0)
    }
}

/// Aggregate `metric` per member. Ties keep the order members first spoke in.
#[must_use]
pub fn analyze_participation(logs: &[ChatLog], metric: ParticipationMetric) -> ParticipationReport {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<ParticipantScore> = Vec::new();
    let mut total = 0u64;

    for log in logs {
        let slot = *index.entry(log.user_id.0.as_str()).or_insert_with(|| {
            entries.push(ParticipantScore {
                user_id: log.user_id.0.clone(),
                username: log.username.clone(),
                value: 0,
                percentage: 0.0,
            });
            entries.len() - 1
        });

        let value = metric.measure(log);
        entries[slot].value += value;
        total += value;
    }

    for entry in &mut entries {
        entry.percentage = if total > 0 {
            entry.value as f64 / total as f64 * 100.0
        } else {
            0.0
        };
    }

    // Stable sort keeps first-seen order among equal values.
    entries.sort_by(|a, b| b.value.cmp(&a.value));

    let times: Vec<f64> = logs.iter().filter_map(ChatLog::epoch_seconds).collect();
    let span = times
        .iter()
        .copied()
        .fold(None, |acc: Option<(f64, f64)>, t| match acc {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        });

    ParticipationReport {
        metric,
        entries,
        total,
        span,
    }
}
