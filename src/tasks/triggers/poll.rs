use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::tasks::AutoPublish;
use crate::tasks::clock::Clock;
use crate::tasks::format::format_entry;
use crate::tasks::seen::{SeenSet, SeenStore};
use crate::tasks::sinks::{Sink, deliver_or_log};
use crate::tasks::sources::FeedSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Auto-publish is off; nothing was fetched.
    Paused,
    FetchFailed,
    Completed { delivered: usize, skipped: usize },
}

/// Periodically delivers feed entries that have not been delivered before.
pub struct FeedPoller {
    source: Arc<dyn FeedSource>,
    sink: Arc<dyn Sink>,
    store: Arc<dyn SeenStore>,
    clock: Arc<dyn Clock>,
    auto_publish: AutoPublish,
    seen: Mutex<SeenSet>,
    poll_interval: Duration,
    send_delay: Duration,
}

impl FeedPoller {
    /// Loads the persisted seen set once; it is the source of truth from here on.
    pub async fn new(
        source: Arc<dyn FeedSource>,
        sink: Arc<dyn Sink>,
        store: Arc<dyn SeenStore>,
        clock: Arc<dyn Clock>,
        auto_publish: AutoPublish,
        poll_interval: Duration,
        send_delay: Duration,
    ) -> Self {
        let seen = store.load().await;
        tracing::info!(count = seen.len(), "Loaded known entries");

        Self {
            source,
            sink,
            store,
            clock,
            auto_publish,
            seen: Mutex::new(seen),
            poll_interval,
            send_delay,
        }
    }

    #[cfg(test)]
    pub async fn seen_count(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub async fn run_loop(&self) {
        tracing::info!(interval = ?self.poll_interval, "Feed poller started");

        loop {
            let outcome = self.run_cycle().await;
            if let CycleOutcome::Completed { delivered, skipped } = outcome {
                tracing::info!(delivered, skipped, "Poll cycle finished");
            }
            tracing::info!(
                auto_publish = self.auto_publish.is_enabled(),
                "Sleeping {}s until next poll",
                self.poll_interval.as_secs()
            );
            self.clock.sleep(self.poll_interval).await;
        }
    }

    /// One fetch-dedup-deliver pass. Entries are delivered oldest first, and
    /// the seen set is persisted at most once per pass.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if !self.auto_publish.is_enabled() {
            tracing::debug!("Auto-publish disabled, skipping poll");
            return CycleOutcome::Paused;
        }

        let entries = match self.source.fetch_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "Failed to fetch feed");
                return CycleOutcome::FetchFailed;
            }
        };

        let mut seen = self.seen.lock().await;
        let mut delivered = 0;
        let mut skipped = 0;

        // feeds list newest first
        for entry in entries.iter().rev() {
            let Some(id) = entry.dedup_id() else {
                tracing::debug!(title = ?entry.title, "Skipping entry without id or link");
                skipped += 1;
                continue;
            };
            if seen.contains(id) {
                continue;
            }

            if delivered > 0 && !self.send_delay.is_zero() {
                self.clock.sleep(self.send_delay).await;
            }

            tracing::info!(id = %id, title = ?entry.title, "New entry detected");
            deliver_or_log(self.sink.as_ref(), &format_entry(entry), None).await;
            seen.insert(id);
            delivered += 1;
        }

        if delivered > 0 {
            if let Err(e) = self.store.save(&seen).await {
                tracing::error!(error = %format!("{e:#}"), "Failed to save seen entries");
            }
        }

        CycleOutcome::Completed { delivered, skipped }
    }
}
