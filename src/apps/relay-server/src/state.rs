use atelier_core::service::integrations::{GmailClient, GoogleCalendarClient};
use atelier_core::{
    AnthropicClient, AppConfig, CredentialManager, FileTokenStore, GoogleOAuthProvider,
    MemoryTokenStore, RepositoryClient, StreamRelay, TokenStore,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub relay: StreamRelay,
    pub credentials: Arc<CredentialManager>,
    pub calendar: GoogleCalendarClient,
    pub mail: GmailClient,
    /// `None` until repository access is configured.
    pub repository: Option<RepositoryClient>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Self {
        let backend = Arc::new(AnthropicClient::new(
            config.generation.base_url.clone(),
            config.generation.api_key.clone(),
        ));
        let relay = StreamRelay::new(backend, config.relay_settings());

        let store: Arc<dyn TokenStore> = match config.token_dir() {
            Some(dir) => {
                tracing::info!("Token records stored under {}", dir.display());
                Arc::new(FileTokenStore::new(dir))
            }
            None => {
                tracing::info!("Token records kept in memory");
                Arc::new(MemoryTokenStore::new())
            }
        };
        let provider = Arc::new(GoogleOAuthProvider::new(config.oauth_settings()));
        let credentials = Arc::new(CredentialManager::new(
            store,
            provider,
            config.accounts.clone(),
        ));

        let repository = config.repository_settings().map(RepositoryClient::new);
        if repository.is_none() {
            tracing::info!("Repository access not configured, /api/files is disabled");
        }

        Self {
            calendar: config.calendar_client(),
            mail: config.mail_client(),
            relay,
            credentials,
            repository,
            config: Arc::new(config),
        }
    }
}
