//! Atelier relay server
//!
//! HTTP surface over `atelier-core`: the chat push stream, account linking,
//! merged calendar/mail views and repository file access.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{create_app, start_server};
pub use state::AppState;
