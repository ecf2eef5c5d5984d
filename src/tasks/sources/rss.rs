use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{FeedEntry, FeedSource};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RssSource {
    http_client: Arc<reqwest::Client>,
    url: String,
}

impl RssSource {
    pub fn new(http_client: Arc<reqwest::Client>, url: String) -> Self {
        Self { http_client, url }
    }
}

#[async_trait]
impl FeedSource for RssSource {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
        let bytes = self
            .http_client
            .get(&self.url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .context("failed to fetch feed")?
            .error_for_status()
            .with_context(|| format!("feed returned error status: {}", self.url))?
            .bytes()
            .await
            .context("failed to read feed body")?;

        let entries = parse_entries(&bytes)?;
        tracing::debug!(url = %self.url, count = entries.len(), "Fetched feed");
        Ok(entries)
    }
}

pub fn parse_entries(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    // feed-rs invents ids for items without one (a title hash or a random
    // UUID); an empty id lets dedup fall back to the link instead
    let feed = feed_rs::parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)
        .context("failed to parse feed")?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            id: Some(entry.id).filter(|id| !id.is_empty()),
            link: entry.links.first().map(|l| l.href.clone()),
            title: entry.title.map(|t| t.content),
            summary: entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body)),
            published: entry.published,
        })
        .collect();

    Ok(entries)
}
