use std::sync::Arc;

use chrono::Duration;

use crate::tasks::AutoPublish;
use crate::tasks::clock::Clock;
use crate::tasks::format::format_entry;
use crate::tasks::sinks::{Sink, deliver_or_log};
use crate::tasks::sources::{FeedEntry, FeedSource};

const RECENT_WINDOW_DAYS: i64 = 7;
const RECENT_LIMIT: usize = 5;

const HELP_TEXT: &str = "<b>Available commands:</b>\n\
    /last7 — show articles from the last 7 days\n\
    /auto_on — enable automatic publishing\n\
    /auto_off — disable automatic publishing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    LastWeek,
    AutoOn,
    AutoOff,
}

impl Command {
    /// Exact, case-sensitive match on the whole message text.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "/news" => Some(Self::Help),
            "/last7" => Some(Self::LastWeek),
            "/auto_on" => Some(Self::AutoOn),
            "/auto_off" => Some(Self::AutoOff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Ignored,
    HelpSent,
    RecentSent { shown: usize, total: usize },
    AutoPublishSet(bool),
}

/// Executes operator commands received through the webhook and replies in the
/// originating chat.
pub struct CommandHandler {
    source: Arc<dyn FeedSource>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    auto_publish: AutoPublish,
}

impl CommandHandler {
    pub fn new(
        source: Arc<dyn FeedSource>,
        sink: Arc<dyn Sink>,
        clock: Arc<dyn Clock>,
        auto_publish: AutoPublish,
    ) -> Self {
        Self { source, sink, clock, auto_publish }
    }

    pub fn auto_publish(&self) -> &AutoPublish {
        &self.auto_publish
    }

    #[tracing::instrument(skip(self), fields(command))]
    pub async fn handle(&self, text: Option<&str>, chat_id: Option<&str>) -> CommandOutcome {
        let (Some(text), Some(chat_id)) = (text, chat_id) else {
            return CommandOutcome::Ignored;
        };
        let Some(command) = Command::parse(text) else {
            tracing::debug!(chat_id = %chat_id, "Ignoring unrecognised message");
            return CommandOutcome::Ignored;
        };
        tracing::Span::current().record("command", tracing::field::debug(&command));

        match command {
            Command::Help => {
                self.reply(chat_id, HELP_TEXT).await;
                CommandOutcome::HelpSent
            }
            Command::LastWeek => self.send_recent(chat_id).await,
            Command::AutoOn => {
                self.auto_publish.set(true);
                tracing::info!(chat_id = %chat_id, "Auto-publish enabled");
                self.reply(chat_id, "Auto-publishing enabled ✔️").await;
                CommandOutcome::AutoPublishSet(true)
            }
            Command::AutoOff => {
                self.auto_publish.set(false);
                tracing::info!(chat_id = %chat_id, "Auto-publish disabled");
                self.reply(chat_id, "Auto-publishing disabled ❌").await;
                CommandOutcome::AutoPublishSet(false)
            }
        }
    }

    async fn send_recent(&self, chat_id: &str) -> CommandOutcome {
        let entries = match self.source.fetch_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "Failed to fetch feed for /last7");
                Vec::new()
            }
        };

        let recent = self.recent_entries(entries);
        if recent.is_empty() {
            self.reply(chat_id, "No articles from the last 7 days.").await;
            return CommandOutcome::RecentSent { shown: 0, total: 0 };
        }

        let total = recent.len();
        let shown = total.min(RECENT_LIMIT);
        for entry in &recent[..shown] {
            self.reply(chat_id, &format_entry(entry)).await;
        }
        if total > RECENT_LIMIT {
            self.reply(chat_id, &format!("Showing {RECENT_LIMIT} of {total} articles."))
                .await;
        }

        CommandOutcome::RecentSent { shown, total }
    }

    /// Entries published within the last week, in feed order. Entries without
    /// a publish time never qualify.
    fn recent_entries(&self, entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
        let cutoff = self.clock.now() - Duration::days(RECENT_WINDOW_DAYS);
        entries
            .into_iter()
            .filter(|entry| entry.published.is_some_and(|published| published >= cutoff))
            .collect()
    }

    async fn reply(&self, chat_id: &str, text: &str) {
        deliver_or_log(self.sink.as_ref(), text, Some(chat_id)).await;
    }
}
