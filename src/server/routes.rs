use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use hyper::StatusCode;
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::webhook::receive_update;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Feed relay running" }))
        .route("/health", get(health))
        .route("/webhook/{secret}", post(receive_update))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "auto_publish": state.commands.auto_publish().is_enabled(),
    }))
}

async fn not_found(req: axum::extract::Request) -> impl IntoResponse {
    tracing::warn!("unhandled path: {}", req.uri());
    (StatusCode::NOT_FOUND, "Not Found")
}
