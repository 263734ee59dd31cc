//! Chat-log analyses: participation shares, topic relevance and contribution.

pub mod clustering;
pub mod contribution;
pub mod participation;
pub mod similarity;
pub mod topic;

pub use contribution::{ContributionAnalyzer, ContributionReport};
pub use participation::{ParticipationMetric, ParticipationReport, analyze_participation};
pub use topic::{TopicRelevanceAnalyzer, TopicRelevanceReport};
