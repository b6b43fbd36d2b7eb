pub mod auth;
pub mod chat;
pub mod feeds;
pub mod files;
pub mod health;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Generation
        .route("/api/chat", post(chat::stream_chat))
        // Account linking
        .route("/api/accounts", get(auth::list_accounts))
        .route("/api/auth/callback", get(auth::callback))
        .route("/api/auth/:account/start", get(auth::start))
        .route("/api/auth/:account/disconnect", post(auth::disconnect))
        // Merged views
        .route("/api/calendar", get(feeds::calendar))
        .route("/api/mail", get(feeds::mail))
        // Repository
        .route("/api/files", get(files::read_file).put(files::write_file))
        // Health check
        .route("/health", get(health::health_check))
        .with_state(state)
}
