use axum::body::Bytes;
use axum::extract::{Path, State};
use hyper::StatusCode;
use serde::Deserialize;

use super::AppState;
use crate::tasks::commands::CommandOutcome;

/// The subset of a Telegram `Update` the relay cares about. Every field is
/// optional so partial payloads still deserialize.
#[derive(Debug, Default, Deserialize)]
pub struct Update {
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub text: Option<String>,
    pub chat: Option<Chat>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: Option<ChatId>,
}

/// Chat ids arrive as JSON numbers from Telegram but may be strings from
/// other callers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Int(i64),
    Str(String),
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatId::Int(id) => write!(f, "{id}"),
            ChatId::Str(id) => f.write_str(id),
        }
    }
}

impl Update {
    /// Lenient parse: anything that is not a JSON object of the expected shape
    /// becomes an empty update.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn text(&self) -> Option<&str> {
        self.message.as_ref()?.text.as_deref()
    }

    pub fn chat_id(&self) -> Option<String> {
        let id = self.message.as_ref()?.chat.as_ref()?.id.as_ref()?;
        Some(id.to_string()).filter(|id| !id.is_empty())
    }
}

#[tracing::instrument(skip_all)]
pub async fn receive_update(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if secret != *state.webhook_secret {
        tracing::warn!("Webhook called with wrong secret");
        return (StatusCode::NOT_FOUND, "Not Found");
    }

    let update = Update::from_body(&body);
    let chat_id = update.chat_id();
    let outcome = state.commands.handle(update.text(), chat_id.as_deref()).await;
    match outcome {
        CommandOutcome::RecentSent { shown, total } => {
            tracing::info!(shown, total, "Answered /last7");
        }
        CommandOutcome::AutoPublishSet(enabled) => {
            tracing::info!(enabled, "Auto-publish toggled via webhook");
        }
        CommandOutcome::HelpSent | CommandOutcome::Ignored => {
            tracing::debug!(outcome = ?outcome, "Handled webhook update");
        }
    }

    (StatusCode::OK, "ok")
}
