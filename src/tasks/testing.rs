//! Shared fakes for the source, sink, store and clock traits.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};

use super::clock::Clock;
use super::seen::{SeenSet, SeenStore};
use super::sinks::Sink;
use super::sources::{FeedEntry, FeedSource};

/// Binds `router` to an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn entry(id: &str) -> FeedEntry {
    FeedEntry {
        id: Some(id.to_string()),
        link: Some(format!("https://example.com/{id}")),
        title: Some(format!("Title {id}")),
        summary: Some(format!("<p>Summary {id}</p>")),
        published: None,
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

pub struct MockSource {
    entries: StdMutex<Result<Vec<FeedEntry>, String>>,
    pub fetches: StdMutex<usize>,
}

impl MockSource {
    pub fn new(entries: Vec<FeedEntry>) -> Self {
        Self {
            entries: StdMutex::new(Ok(entries)),
            fetches: StdMutex::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            entries: StdMutex::new(Err(message.to_string())),
            fetches: StdMutex::new(0),
        }
    }

    pub fn set_entries(&self, entries: Vec<FeedEntry>) {
        *self.entries.lock().unwrap() = Ok(entries);
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl FeedSource for MockSource {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
        *self.fetches.lock().unwrap() += 1;
        self.entries.lock().unwrap().clone().map_err(anyhow::Error::msg)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub sent: StdMutex<Vec<(String, Option<String>)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self { sent: StdMutex::new(Vec::new()), fail: true }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn chats(&self) -> Vec<Option<String>> {
        self.sent.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn deliver(&self, text: &str, chat_id: Option<&str>) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((text.to_string(), chat_id.map(String::from)));
        if self.fail {
            anyhow::bail!("simulated delivery failure");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    initial: SeenSet,
    pub saves: StdMutex<Vec<SeenSet>>,
    fail: bool,
}

impl MemoryStore {
    pub fn with(ids: &[&str]) -> Self {
        Self {
            initial: ids.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<SeenSet> {
        self.saves.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SeenStore for MemoryStore {
    async fn load(&self) -> SeenSet {
        self.initial.clone()
    }

    async fn save(&self, seen: &SeenSet) -> Result<()> {
        self.saves.lock().unwrap().push(seen.clone());
        if self.fail {
            anyhow::bail!("disk full");
        }
        Ok(())
    }
}

/// Clock frozen at a fixed instant that records sleeps instead of waiting.
pub struct ManualClock {
    now: DateTime<Utc>,
    pub sleeps: StdMutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now, sleeps: StdMutex::new(Vec::new()) }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}
