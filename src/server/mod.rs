pub mod routes;
pub mod webhook;

use std::sync::Arc;

use axum::Router;

use crate::tasks::commands::CommandHandler;

#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<CommandHandler>,
    pub webhook_secret: Arc<str>,
}

pub fn create_app(state: AppState) -> Router {
    routes::build_router(state)
}
