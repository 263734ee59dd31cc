//! Chat-log retrieval: walks a channel's history and resolves authors.

use futures::stream::{self, StreamExt};
use slack_morphism::{SlackTs, SlackUserId};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use super::client::{HISTORY_PAGE_LIMIT, HistoryMessage, SlackClient};
use crate::core::models::{AuthorFilter, ChatLog};
use crate::errors::BotError;

/// `users.info` lookups in flight at once.
pub const USER_LOOKUP_CONCURRENCY: usize = 8;

/// Display names resolved so far, shared across history pages.
///
/// `None` marks a user Slack refused to describe; their messages are skipped.
#[derive(Debug, Default)]
pub struct UserDirectory {
    names: HashMap<String, Option<String>>,
}

impl UserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&str> {
        self.names.get(user_id).and_then(|n| n.as_deref())
    }

    #[must_use]
    pub fn contains(&self, user_id: &str) -> bool {
        self.names.contains_key(user_id)
    }

    pub fn insert(&mut self, user_id: String, name: Option<String>) {
        self.names.insert(user_id, name);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up every not-yet-seen author of `messages`, at most
    /// [`USER_LOOKUP_CONCURRENCY`] at a time.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; refused lookups are cached as `None`.
    pub async fn resolve_authors(
        &mut self,
        client: &SlackClient,
        messages: &[HistoryMessage],
    ) -> Result<(), BotError> {
        let unseen: HashSet<&str> = messages
            .iter()
            .filter_map(|m| m.user.as_deref())
            .filter(|uid| !self.contains(uid))
            .collect();

        let mut lookups = stream::iter(unseen)
            .map(|uid| async move { (uid.to_string(), client.user_display_name(uid).await) })
            .buffer_unordered(USER_LOOKUP_CONCURRENCY);

        while let Some((uid, res)) = lookups.next().await {
            let name = res?;
            if name.is_none() {
                warn!("Skipping messages from unresolvable user {}", uid);
            }
            self.insert(uid, name);
        }
        Ok(())
    }
}

/// Collect a channel's whole history as chronologically ordered chat logs.
///
/// Messages without an author (joins, bot integrations) and messages from
/// users Slack will not describe are skipped; `filter` decides whether this
/// bot's own messages are kept.
///
/// # Errors
///
/// Returns an error if `auth.test`, `conversations.history` or a user lookup fails.
pub async fn fetch_chat_log(
    client: &SlackClient,
    channel_id: &str,
    filter: AuthorFilter,
) -> Result<Vec<ChatLog>, BotError> {
    let bot_user_id = client.bot_user_id().await?;
    let mut directory = UserDirectory::new();
    let mut chat_logs = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = client
            .history_page(channel_id, cursor.as_deref(), HISTORY_PAGE_LIMIT)
            .await?;
        pages += 1;

        directory.resolve_authors(client, &page.messages).await?;
        chat_logs.extend(collect_page(page.messages, &directory, &bot_user_id, filter));

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    // Slack pages newest first.
    chat_logs.reverse();

    info!(
        "Collected {} chat logs from {} ({} pages, {} authors)",
        chat_logs.len(),
        channel_id,
        pages,
        directory.len()
    );
    Ok(chat_logs)
}

/// Turn one page of raw messages into chat logs, keeping page order.
#[must_use]
pub fn collect_page(
    messages: Vec<HistoryMessage>,
    directory: &UserDirectory,
    bot_user_id: &str,
    filter: AuthorFilter,
) -> Vec<ChatLog> {
    messages
        .into_iter()
        .filter_map(|msg| {
            let user_id = msg.user?;
            let username = directory.get(&user_id)?.to_string();
            if !filter.keeps(&user_id, bot_user_id) {
                return None;
            }
            Some(ChatLog {
                user_id: SlackUserId(user_id),
                username,
                text: msg.text.unwrap_or_default(),
                ts: SlackTs(msg.ts),
                reactions: msg.reactions,
            })
        })
        .collect()
}
