//! Prompt construction and reply parsing for the analysis models.

use once_cell::sync::Lazy;
use regex::Regex;

use super::client::estimate_tokens;

/// Upper bound on transcript tokens sent for topic extraction; older lines
/// are dropped first when a channel exceeds it.
pub const MAX_TRANSCRIPT_TOKENS: usize = 100_000;

/// Max characters kept from a single utterance inside a prompt.
pub const MAX_UTTERANCE_CHARS: usize = 2_000;

/// Strip control characters and hard-truncate text before it enters a prompt.
#[must_use]
pub fn sanitize_utterance(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .take(MAX_UTTERANCE_CHARS)
        .collect()
}

/// One transcript line: `"{index}: <@{username}>: {text}"`.
#[must_use]
pub fn transcript_line(index: usize, username: &str, text: &str) -> String {
    format!("{index}: <@{username}>: {}", sanitize_utterance(text))
}

/// Join transcript lines, keeping the most recent ones that fit the token budget.
#[must_use]
pub fn fit_transcript(lines: &[String], max_tokens: usize) -> String {
    let mut budget = max_tokens;
    let mut start = lines.len();
    for line in lines.iter().rev() {
        let cost = estimate_tokens(line);
        if cost > budget {
            break;
        }
        budget -= cost;
        start -= 1;
    }
    lines[start..].join("\n")
}

#[must_use]
pub fn topic_extraction_prompt(transcript: &str) -> String {
    format!(
        "You are an expert at extracting the topic of a meeting.\n\n\
         Here is the full conversation of the meeting:\n\
         '{transcript}'\n\n\
         Summarize the main topic of this meeting as a single noun phrase of at most 10 characters, \
         written in the language of the conversation.\n\
         Examples: 'Launch plan', 'Budget cuts'\n\
         Reply with the topic only and nothing else."
    )
}

/// Clean a raw topic reply: trim, cut at the first `|`, drop wrapping quotes.
#[must_use]
pub fn parse_topic_reply(reply: &str) -> Option<String> {
    let first = reply.trim().split('|').next().unwrap_or("");
    let first = first.lines().next().unwrap_or("").trim();
    let topic = first
        .trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .trim();
    if topic.is_empty() {
        None
    } else {
        Some(topic.to_string())
    }
}

#[must_use]
pub fn contribution_prompt(utterance_line: &str) -> String {
    format!(
        "Utterance: '{utterance_line}'\n\n\
         Rate the utterance above on a 1 to 5 scale for each of these four criteria:\n\
         1. Drives discussion and draws out other members\n\
         2. Sets the meeting's direction and helps reach conclusions\n\
         3. Contributes to achieving the meeting's goal\n\
         4. Encourages collaboration and narrows differences of opinion\n\n\
         Format:\n\
         [discussion score, direction score, goal score, collaboration score]\n\n\
         Reply in exactly that format with no further explanation."
    )
}

/// Four criterion scores pulled from a contribution reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriterionScores {
    pub discussion: u32,
    pub direction: u32,
    pub goal: u32,
    pub collaboration: u32,
}

/// Find `[a, b, c, d]` anywhere in the reply.
#[must_use]
pub fn parse_contribution_reply(reply: &str) -> Option<CriterionScores> {
    static SCORES_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\[(\d+),\s*(\d+),\s*(\d+),\s*(\d+)\]").expect("static regex compile")
    });

    let caps = SCORES_RE.captures(reply.trim())?;
    let n = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    Some(CriterionScores {
        discussion: n(1)?,
        direction: n(2)?,
        goal: n(3)?,
        collaboration: n(4)?,
    })
}
