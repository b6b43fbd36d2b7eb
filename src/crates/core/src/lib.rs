// Atelier Core Library - relay and credential logic shared by the server
// Layers: Util -> Infrastructure -> Service

pub mod infrastructure; // Infrastructure layer - generation client, token storage
pub mod service; // Service layer - relay, credentials, integrations, repository, config
pub mod util; // Utility layer - errors

pub use util::errors::*;

pub use infrastructure::{
    ai::{AnthropicClient, GenerationBackend},
    storage::{FileTokenStore, MemoryTokenStore, TokenStore},
};

pub use service::{
    config::AppConfig,
    credentials::{CredentialManager, GoogleOAuthProvider, OAuthProvider},
    identity::Identity,
    integrations::{merge_accounts, GmailClient, GoogleCalendarClient, MergedResultSet, SortOrder},
    relay::{ConversationTurn, RelayEvent, RelaySettings, StreamRelay},
    repository::{resolve_target_path, RepositoryClient},
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
