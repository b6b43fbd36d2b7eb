//! Service layer: relay, credentials, integrations, repository, identity and configuration.

pub mod config;
pub mod credentials;
pub mod identity;
pub mod integrations;
pub mod relay;
pub mod repository;

pub use config::AppConfig;
pub use identity::Identity;
