use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::Sink;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessageForm<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Delivers HTML-formatted messages through the Telegram Bot API.
pub struct TelegramSink {
    http_client: Arc<reqwest::Client>,
    api_base: String,
    bot_token: String,
    default_chat_id: String,
}

impl TelegramSink {
    pub fn new(
        http_client: Arc<reqwest::Client>,
        api_base: String,
        bot_token: String,
        default_chat_id: String,
    ) -> Self {
        Self { http_client, api_base, bot_token, default_chat_id }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Sink for TelegramSink {
    async fn deliver(&self, text: &str, chat_id: Option<&str>) -> Result<()> {
        let chat_id = chat_id.unwrap_or(&self.default_chat_id);
        let form = SendMessageForm {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let response = self
            .http_client
            .post(self.send_message_url())
            .timeout(SEND_TIMEOUT)
            .form(&form)
            .send()
            .await
            // reqwest errors embed the request URL, which carries the bot token
            .map_err(|e| anyhow::anyhow!("failed to call Telegram sendMessage: {}", e.without_url()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Telegram API returned {status}: {body}");
        }

        let json: serde_json::Value =
            serde_json::from_str(&body).context("failed to parse Telegram response")?;
        if !json.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            anyhow::bail!("Telegram API rejected message: {body}");
        }

        tracing::info!(chat_id = %chat_id, "Delivered message to Telegram");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::serve;
    use axum::extract::{Form, Path, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    type Captured = Arc<StdMutex<Vec<(String, HashMap<String, String>)>>>;

    async fn telegram_stub(status: StatusCode, body: serde_json::Value) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let router = Router::new()
            .route(
                "/{bot}/sendMessage",
                post(
                    move |State(captured): State<Captured>,
                          Path(bot): Path<String>,
                          Form(form): Form<HashMap<String, String>>| {
                        let body = body.clone();
                        async move {
                            captured.lock().unwrap().push((bot, form));
                            (status, Json(body))
                        }
                    },
                ),
            )
            .with_state(captured.clone());
        (serve(router).await, captured)
    }

    fn sink(base: String) -> TelegramSink {
        TelegramSink::new(
            Arc::new(reqwest::Client::new()),
            base,
            "123:token".to_string(),
            "-100default".to_string(),
        )
    }

    #[tokio::test]
    async fn test_deliver_posts_form_fields() {
        let (base, captured) = telegram_stub(StatusCode::OK, json!({"ok": true})).await;

        sink(base).deliver("<b>Hi</b> &amp; bye", Some("42")).await.unwrap();

        let calls = captured.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (bot, form) = &calls[0];
        assert_eq!(bot, "bot123:token");
        assert_eq!(form["chat_id"], "42");
        assert_eq!(form["text"], "<b>Hi</b> &amp; bye");
        assert_eq!(form["parse_mode"], "HTML");
        assert_eq!(form["disable_web_page_preview"], "false");
    }

    #[tokio::test]
    async fn test_deliver_falls_back_to_default_chat() {
        let (base, captured) = telegram_stub(StatusCode::OK, json!({"ok": true})).await;

        sink(base).deliver("hello", None).await.unwrap();

        let calls = captured.lock().unwrap();
        assert_eq!(calls[0].1["chat_id"], "-100default");
    }

    #[tokio::test]
    async fn test_error_status_includes_body() {
        let (base, _) = telegram_stub(
            StatusCode::BAD_REQUEST,
            json!({"ok": false, "description": "Bad Request: can't parse entities"}),
        )
        .await;

        let err = sink(base).deliver("<b>broken", None).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("can't parse entities"));
    }

    #[tokio::test]
    async fn test_ok_false_is_error() {
        let (base, _) = telegram_stub(StatusCode::OK, json!({"ok": false})).await;
        assert!(sink(base).deliver("text", None).await.is_err());
    }

    #[tokio::test]
    async fn test_deliver_or_log_swallows_failures() {
        let (base, _) = telegram_stub(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
        let sink = sink(base);
        assert!(!crate::tasks::sinks::deliver_or_log(&sink, "text", None).await);
    }

    #[tokio::test]
    async fn test_unreachable_api_is_error_without_token() {
        let sink = sink("http://127.0.0.1:1".to_string());
        let err = sink.deliver("text", None).await.unwrap_err();
        assert!(!err.to_string().contains("123:token"));
    }
}
