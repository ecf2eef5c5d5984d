pub mod rss;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One item of a syndication feed, as retrieved by the latest fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Stable identifier used for dedup: the entry id, or its link when the
    /// feed provides no id.
    pub fn dedup_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.link.as_deref().filter(|link| !link.is_empty()))
    }
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Returns the feed's current entries in feed order (newest first for
    /// typical feeds).
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>>;
}
