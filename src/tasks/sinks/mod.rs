pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Sink: Send + Sync {
    /// Delivers `text` to `chat_id`, or to the sink's default chat when `None`.
    async fn deliver(&self, text: &str, chat_id: Option<&str>) -> Result<()>;
}

/// Single best-effort delivery. Failures are logged and swallowed.
pub async fn deliver_or_log(sink: &dyn Sink, text: &str, chat_id: Option<&str>) -> bool {
    match sink.deliver(text, chat_id).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(chat_id = chat_id.unwrap_or("default"), error = %format!("{e:#}"), "Failed to deliver message");
            false
        }
    }
}
