//! Meeting contribution: every utterance is rated by the model on four criteria
//! and the ratings are summed per member.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::topic::{IndexedUtterance, index_utterances};
use crate::ai::LanguageModel;
use crate::ai::prompts::{CriterionScores, contribution_prompt, parse_contribution_reply};
use crate::core::models::ChatLog;

/// Model calls allowed in flight at once.
pub const EVALUATION_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CriterionTotals {
    pub discussion: u32,
    pub direction: u32,
    pub goal: u32,
    pub collaboration: u32,
}

impl CriterionTotals {
    fn add(&mut self, scores: &CriterionScores) {
        self.discussion += scores.discussion;
        self.direction += scores.direction;
        self.goal += scores.goal;
        self.collaboration += scores.collaboration;
    }

    fn merge(&mut self, other: &CriterionTotals) {
        self.discussion += other.discussion;
        self.direction += other.direction;
        self.goal += other.goal;
        self.collaboration += other.collaboration;
    }

    #[must_use]
    pub fn sum(&self) -> u32 {
        self.discussion + self.direction + self.goal + self.collaboration
    }

    /// Values in display order: discussion, direction, goal, collaboration.
    #[must_use]
    pub fn as_array(&self) -> [u32; 4] {
        [self.discussion, self.direction, self.goal, self.collaboration]
    }
}

/// Display names of the four criteria, in [`CriterionTotals::as_array`] order.
pub const CRITERIA: [&str; 4] = [
    "Discussion",
    "Direction",
    "Goal",
    "Collaboration",
];

/// One rated utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceEvaluation {
    pub index: usize,
    pub user_id: String,
    pub username: String,
    pub scores: CriterionScores,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberContribution {
    pub user_id: String,
    pub username: String,
    pub totals: CriterionTotals,
}

impl MemberContribution {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.totals.sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContributionReport {
    /// Highest total first.
    pub members: Vec<MemberContribution>,
    pub team: CriterionTotals,
    pub evaluated: usize,
    pub skipped: usize,
}

impl ContributionReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member recommended as meeting leader.
    #[must_use]
    pub fn leader(&self) -> Option<&MemberContribution> {
        self.members.first()
    }

    /// Team total per criterion divided by member count.
    #[must_use]
    pub fn averages(&self) -> [f64; 4] {
        let n = self.members.len();
        self.team
            .as_array()
            .map(|v| if n == 0 { 0.0 } else { f64::from(v) / n as f64 })
    }
}

/// Sum evaluations per member. Ties keep first-seen order.
#[must_use]
pub fn aggregate_contributions(evaluations: &[UtteranceEvaluation]) -> Vec<MemberContribution> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut members: Vec<MemberContribution> = Vec::new();

    for eval in evaluations {
        let slot = *index.entry(eval.user_id.as_str()).or_insert_with(|| {
            members.push(MemberContribution {
                user_id: eval.user_id.clone(),
                username: eval.username.clone(),
                totals: CriterionTotals::default(),
            });
            members.len() - 1
        });
        members[slot].totals.add(&eval.scores);
    }

    members.sort_by(|a, b| b.total().cmp(&a.total()));
    members
}

pub struct ContributionAnalyzer<'a> {
    llm: &'a dyn LanguageModel,
}

impl<'a> ContributionAnalyzer<'a> {
    #[must_use]
    pub fn new(llm: &'a dyn LanguageModel) -> Self {
        Self { llm }
    }

    async fn evaluate(&self, utterance: &IndexedUtterance) -> Option<UtteranceEvaluation> {
        let prompt = contribution_prompt(&utterance.transcript_line());
        let reply = match self.llm.generate(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Evaluation of utterance {} failed: {}", utterance.index, e);
                return None;
            }
        };

        match parse_contribution_reply(&reply) {
            Some(scores) => Some(UtteranceEvaluation {
                index: utterance.index,
                user_id: utterance.user_id.clone(),
                username: utterance.username.clone(),
                scores,
            }),
            None => {
                debug!(
                    "Unparsable evaluation for utterance {}: {:?}",
                    utterance.index, reply
                );
                None
            }
        }
    }

    /// Rate every non-blank utterance, in order, and aggregate per member.
    /// Failed or unparsable ratings are skipped.
    pub async fn analyze(&self, logs: &[ChatLog]) -> ContributionReport {
        let utterances = index_utterances(logs);

        let results: Vec<Option<UtteranceEvaluation>> = stream::iter(utterances.iter())
            .map(|u| self.evaluate(u))
            .buffered(EVALUATION_CONCURRENCY)
            .collect()
            .await;

        let evaluations: Vec<UtteranceEvaluation> = results.into_iter().flatten().collect();
        let skipped = utterances.len() - evaluations.len();

        let members = aggregate_contributions(&evaluations);
        let mut team = CriterionTotals::default();
        for member in &members {
            team.merge(&member.totals);
        }

        info!(
            evaluated = evaluations.len(),
            skipped,
            members = members.len(),
            "Contribution analysis finished"
        );

        ContributionReport {
            members,
            team,
            evaluated: evaluations.len(),
            skipped,
        }
    }
}
