//! Block Kit payloads for greetings and analysis reports.

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{Value, json};

use crate::analysis::contribution::{CRITERIA, ContributionReport};
use crate::analysis::participation::ParticipationReport;
use crate::analysis::topic::TopicRelevanceReport;

pub const GREETING_FALLBACK: &str = "Hi there! I'm Degul!";

/// Slack rejects a message carrying more blocks than this.
pub const MAX_BLOCKS: usize = 50;
/// Slack rejects a section whose text is longer than this (in characters).
pub const MAX_SECTION_CHARS: usize = 3000;

fn section(text: impl Into<String>) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text.into() }
    })
}

fn fields(items: Vec<String>) -> Value {
    let fields: Vec<Value> = items
        .into_iter()
        .map(|text| json!({ "type": "mrkdwn", "text": text }))
        .collect();
    json!({ "type": "section", "fields": fields })
}

fn context(text: impl Into<String>) -> Value {
    json!({
        "type": "context",
        "elements": [{ "type": "mrkdwn", "text": text.into() }]
    })
}

fn divider() -> Value {
    json!({ "type": "divider" })
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// Join `entries` with `separator` into as few section texts as fit under
/// [`MAX_SECTION_CHARS`]. An entry never spans two sections.
#[must_use]
pub fn pack_lines(entries: &[String], separator: &str) -> Vec<String> {
    let separator_len = separator.chars().count();
    let mut packed = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for entry in entries {
        let entry = clip(entry, MAX_SECTION_CHARS);
        let entry_len = entry.chars().count();
        if !current.is_empty() && current_len + separator_len + entry_len > MAX_SECTION_CHARS {
            packed.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str(separator);
            current_len += separator_len;
        }
        current.push_str(&entry);
        current_len += entry_len;
    }
    if !current.is_empty() {
        packed.push(current);
    }
    packed
}

/// Append the packed member sections, leaving room for `reserved` trailing
/// blocks. Sections that would break [`MAX_BLOCKS`] are replaced by a note.
fn push_member_sections(
    blocks: &mut Vec<Value>,
    entries: &[String],
    separator: &str,
    reserved: usize,
) {
    let texts = pack_lines(entries, separator);
    let room = MAX_BLOCKS.saturating_sub(blocks.len() + reserved);
    if texts.len() <= room {
        blocks.extend(texts.into_iter().map(section));
        return;
    }

    let shown = room.saturating_sub(1);
    let omitted = texts.len() - shown;
    blocks.extend(texts.into_iter().take(shown).map(section));
    blocks.push(context(format!(
        "{omitted} more section(s) did not fit in one message."
    )));
}

#[must_use]
pub fn greeting_blocks() -> Value {
    json!([
        section(
            "*Hi there! I'm Degul, rolling along!* :bird:\n\
             I help team projects and group assignments roll smoothly. \
             I run all kinds of analyses on your channel so collaboration goes better. \
             Call me any time you have a question!"
        ),
        divider(),
        context(
            "Try `/발화량`, `/메시지수`, `/반응수`, `/주제유사도` or `/기여도` \
             (or `/speech`, `/messages`, `/reactions`, `/topic`, `/contribution`) \
             to analyse this channel!"
        ),
    ])
}

/// `2024-05-01 09:00 ~ 2024-05-01 18:30 (Asia/Seoul)`
#[must_use]
pub fn format_period(span: (f64, f64), tz: Tz) -> Option<String> {
    let at = |secs: f64| {
        Utc.timestamp_opt(secs.floor() as i64, 0)
            .single()
            .map(|t| t.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string())
    };
    Some(format!("{} ~ {} ({})", at(span.0)?, at(span.1)?, tz.name()))
}

#[must_use]
pub fn participation_blocks(report: &ParticipationReport, tz: Tz) -> Value {
    let unit = report.metric.unit();
    let mut blocks = vec![
        section(format!(
            "*{} analysis results!* :sparkles:",
            report.metric.title()
        )),
        divider(),
        fields(vec![
            format!("*Total:* {}", report.total),
            format!("*Average:* {:.2}", report.average()),
            format!("*Max:* {}", report.max()),
            format!("*Min:* {}", report.min()),
        ]),
        divider(),
    ];

    if let Some(mvp) = report.mvp() {
        blocks.push(section(format!(
            ":crown: The participation MVP is *{}*! Amazing work!",
            mvp.username
        )));
        blocks.push(divider());
    }

    let lines: Vec<String> = report
        .entries
        .iter()
        .map(|entry| {
            format!(
                "*{}*: {} {} ({:.1}%)",
                entry.username, entry.value, unit, entry.percentage
            )
        })
        .collect();
    let period = report.span.and_then(|span| format_period(span, tz));
    push_member_sections(&mut blocks, &lines, "\n", usize::from(period.is_some()));

    if let Some(period) = period {
        blocks.push(context(format!("Analysed period: {period}")));
    }

    Value::Array(blocks)
}

#[must_use]
pub fn topic_relevance_blocks(report: &TopicRelevanceReport) -> Value {
    let stats = &report.statistics;
    let mut blocks = vec![
        section(format!(
            "*Topic relevance analysis results!* :sparkles:\nExtracted topic: *{}*",
            report.topic
        )),
        fields(vec![
            format!("*Max:* {:.4}", stats.max),
            format!("*Min:* {:.4}", stats.min),
            format!("*Mean:* {:.4}", stats.mean),
            format!("*Median:* {:.4}", stats.median),
            format!("*Std dev:* {:.4}", stats.std_dev),
            format!("*Cluster threshold:* {:.4}", report.threshold.value),
        ]),
        divider(),
    ];

    if let Some(mvp) = report.mvp() {
        blocks.push(section(format!(
            ":crown: The on-topic MVP is *{}*! Amazing work! :tada:",
            mvp.username
        )));
        blocks.push(divider());
    }

    let lines: Vec<String> = report
        .users
        .iter()
        .map(|user| {
            format!(
                "*{}*: {}/{} on-topic messages ({:.1}%)",
                user.username,
                user.high_similarity_count,
                user.message_count,
                user.ratio * 100.0
            )
        })
        .collect();
    push_member_sections(&mut blocks, &lines, "\n", 0);

    Value::Array(blocks)
}

#[must_use]
pub fn contribution_blocks(report: &ContributionReport) -> Value {
    let team = report.team.as_array();
    let averages = report.averages();
    let mut stat_fields = Vec::with_capacity(8);
    for (k, name) in CRITERIA.iter().enumerate() {
        stat_fields.push(format!("*Total {} score:* {}", name.to_lowercase(), team[k]));
        stat_fields.push(format!(
            "*Average {} score:* {:.2}",
            name.to_lowercase(),
            averages[k]
        ));
    }

    let mut blocks = vec![
        section("*Meeting contribution analysis results!* :sparkles:"),
        divider(),
        fields(stat_fields),
        divider(),
    ];

    if let Some(leader) = report.leader() {
        blocks.push(section(format!(
            "*Recommended team lead:* <@{}> ({})!\n\
             Thanks to you our team keeps rolling along! :turtle::dash:\n\
             Total score: {} :first_place_medal:",
            leader.user_id,
            leader.username,
            leader.total()
        )));
        blocks.push(divider());
    }

    let cards: Vec<String> = report
        .members
        .iter()
        .map(|member| {
            let scores = member.totals.as_array();
            let mut text = format!("*{}*:", member.username);
            for (name, score) in CRITERIA.iter().zip(scores) {
                text.push_str(&format!("\n• {name}: {score}"));
            }
            text.push_str(&format!("\n• Total: {}", member.total()));
            text
        })
        .collect();
    push_member_sections(&mut blocks, &cards, "\n\n", 0);

    Value::Array(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::clustering::Threshold;
    use crate::analysis::contribution::{CriterionTotals, MemberContribution};
    use crate::analysis::participation::{ParticipantScore, ParticipationMetric};
    use crate::analysis::similarity::SimilarityStatistics;
    use crate::analysis::topic::UserRelevance;

    const CROWD: usize = 60;

    fn assert_postable(blocks: &Value) {
        let blocks = blocks.as_array().unwrap();
        assert!(blocks.len() <= MAX_BLOCKS, "{} blocks", blocks.len());
        for block in blocks {
            if let Some(text) = block["text"]["text"].as_str() {
                assert!(text.chars().count() <= MAX_SECTION_CHARS);
            }
        }
    }

    fn participation(entries: Vec<ParticipantScore>, span: Option<(f64, f64)>) -> ParticipationReport {
        let total = entries.iter().map(|e| e.value).sum();
        ParticipationReport {
            metric: ParticipationMetric::SpeechAmount,
            entries,
            total,
            span,
        }
    }

    #[test]
    fn test_greeting_lists_commands() {
        let blocks = greeting_blocks();
        assert_eq!(blocks.as_array().map(Vec::len), Some(3));
        let context = blocks[2]["elements"][0]["text"].as_str().unwrap();
        assert!(context.contains("/발화량"));
        assert!(context.contains("/기여도"));
    }

    #[test]
    fn test_participation_blocks_layout() {
        let report = participation(
            vec![
                ParticipantScore {
                    user_id: "U1".into(),
                    username: "alice".into(),
                    value: 30,
                    percentage: 75.0,
                },
                ParticipantScore {
                    user_id: "U2".into(),
                    username: "bob".into(),
                    value: 10,
                    percentage: 25.0,
                },
            ],
            Some((1_700_000_000.0, 1_700_003_600.0)),
        );
        let blocks = participation_blocks(&report, chrono_tz::Asia::Seoul);
        let stats = &blocks[2]["fields"];
        assert_eq!(stats[0]["text"], "*Total:* 40");
        assert_eq!(stats[1]["text"], "*Average:* 20.00");
        assert!(blocks[4]["text"]["text"].as_str().unwrap().contains("*alice*"));
        assert_eq!(
            blocks[6]["text"]["text"],
            "*alice*: 30 characters (75.0%)\n*bob*: 10 characters (25.0%)"
        );
        let last = blocks.as_array().unwrap().last().unwrap();
        assert_eq!(
            last["elements"][0]["text"],
            "Analysed period: 2023-11-15 07:13 ~ 2023-11-15 08:13 (Asia/Seoul)"
        );
    }

    #[test]
    fn test_empty_participation_has_no_mvp() {
        let blocks = participation_blocks(&participation(vec![], None), chrono_tz::UTC);
        let text = blocks.to_string();
        assert!(!text.contains("MVP"));
        assert_eq!(blocks.as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn test_format_period_uses_timezone() {
        assert_eq!(
            format_period((0.0, 60.0), chrono_tz::UTC).as_deref(),
            Some("1970-01-01 00:00 ~ 1970-01-01 00:01 (UTC)")
        );
    }

    #[test]
    fn test_pack_lines_splits_at_section_limit() {
        let line = "x".repeat(1000);
        let entries = vec![line.clone(), line.clone(), line.clone(), "tail".to_string()];
        let packed = pack_lines(&entries, "\n");
        assert_eq!(packed.len(), 2);
        assert_eq!(packed[0], format!("{line}\n{line}"));
        assert_eq!(packed[1], format!("{line}\ntail"));
        assert!(pack_lines(&[], "\n").is_empty());
    }

    #[test]
    fn test_pack_lines_clips_oversized_entry() {
        let packed = pack_lines(&["가".repeat(MAX_SECTION_CHARS + 10)], "\n");
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].chars().count(), MAX_SECTION_CHARS);
    }

    #[test]
    fn test_large_participation_report_fits_one_message() {
        let entries = (0..CROWD)
            .map(|i| ParticipantScore {
                user_id: format!("U{i}"),
                username: format!("member{i}"),
                value: (CROWD - i) as u64,
                percentage: 1.0,
            })
            .collect();
        let blocks = participation_blocks(
            &participation(entries, Some((1_700_000_000.0, 1_700_003_600.0))),
            chrono_tz::UTC,
        );
        assert_postable(&blocks);
        let text = blocks.to_string();
        assert!(text.contains("*member0*"));
        assert!(text.contains("*member59*"));
        assert!(text.contains("Analysed period"));
    }

    #[test]
    fn test_large_topic_report_fits_one_message() {
        let users = (0..CROWD)
            .map(|i| UserRelevance {
                user_id: format!("U{i}"),
                username: format!("member{i}"),
                high_similarity_count: 1,
                message_count: 2,
                ratio: 0.5,
            })
            .collect();
        let report = TopicRelevanceReport {
            topic: "Budget".into(),
            scores: vec![0.2, 0.8],
            statistics: SimilarityStatistics::from_scores(&[0.2, 0.8]).unwrap(),
            threshold: Threshold {
                value: 0.5,
                topic_min: 0.8,
                off_topic_max: Some(0.2),
            },
            users,
        };
        let blocks = topic_relevance_blocks(&report);
        assert_postable(&blocks);
        assert!(blocks.to_string().contains("*member59*"));
    }

    #[test]
    fn test_large_contribution_report_fits_one_message() {
        let members: Vec<MemberContribution> = (0..CROWD)
            .map(|i| MemberContribution {
                user_id: format!("U{i}"),
                username: format!("member{i}"),
                totals: CriterionTotals {
                    discussion: 5,
                    direction: 4,
                    goal: 3,
                    collaboration: 2,
                },
            })
            .collect();
        let report = ContributionReport {
            team: CriterionTotals {
                discussion: 300,
                direction: 240,
                goal: 180,
                collaboration: 120,
            },
            members,
            evaluated: CROWD,
            skipped: 0,
        };
        let blocks = contribution_blocks(&report);
        assert_postable(&blocks);
        let text = blocks.to_string();
        assert!(text.contains("<@U0> (member0)"));
        assert!(text.contains("*member59*:"));
    }

    #[test]
    fn test_overflowing_sections_are_capped_with_note() {
        let entries: Vec<String> = (0..200).map(|i| format!("{i}{}", "y".repeat(2990))).collect();
        let mut blocks = vec![section("header"), divider()];
        push_member_sections(&mut blocks, &entries, "\n", 1);
        assert_eq!(blocks.len(), MAX_BLOCKS - 1);
        let note = blocks.last().unwrap()["elements"][0]["text"].as_str().unwrap();
        assert!(note.contains("did not fit"));
    }
}
