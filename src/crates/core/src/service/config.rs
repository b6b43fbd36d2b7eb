//! Application configuration.
//!
//! Loaded from an optional TOML file named by `ATELIER_CONFIG`, then overridden
//! field by field from `ATELIER_*` environment variables.

use crate::service::credentials::{default_google_scopes, OAuthSettings};
use crate::service::integrations::{
    GmailClient, GoogleCalendarClient, DEFAULT_CALENDAR_WINDOW_DAYS, DEFAULT_GOOGLE_API_BASE,
    DEFAULT_MAIL_QUERY,
};
use crate::service::relay::{RelaySettings, DEFAULT_SYSTEM_PROMPT};
use crate::service::repository::{RepositorySettings, DEFAULT_GITHUB_API_BASE};
use crate::util::errors::{AtelierError, AtelierResult};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "ATELIER_CONFIG";
pub const MAX_CALENDAR_WINDOW_DAYS: u32 = 366;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    pub oauth: OAuthConfig,
    pub accounts: Vec<String>,
    pub integrations: IntegrationsConfig,
    pub token_store: TokenStoreConfig,
    pub repository: RepositoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub thinking_budget: Option<u32>,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Days of upcoming calendar events to fetch.
    pub calendar_window_days: u32,
    /// Gmail search query for the mail view.
    pub mail_query: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenStoreConfig {
    /// Directory for token records; empty keeps them in memory.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    pub api_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            generation: GenerationConfig::default(),
            oauth: OAuthConfig::default(),
            accounts: vec!["personal".to_string(), "work".to_string()],
            integrations: IntegrationsConfig::default(),
            token_store: TokenStoreConfig::default(),
            repository: RepositoryConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            allowed_origin: "*".to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let relay = RelaySettings::default();
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            model: relay.model,
            max_tokens: relay.max_tokens,
            thinking_budget: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        let google = OAuthSettings::google(String::new(), String::new(), String::new());
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:8787/api/auth/callback".to_string(),
            scopes: default_google_scopes(),
            auth_url: google.auth_url,
            token_url: google.token_url,
            userinfo_url: google.userinfo_url,
            api_base: DEFAULT_GOOGLE_API_BASE.to_string(),
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            calendar_window_days: DEFAULT_CALENDAR_WINDOW_DAYS,
            mail_query: DEFAULT_MAIL_QUERY.to_string(),
        }
    }
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|dir| dir.join("atelier").join("tokens"))
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            token: String::new(),
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
        }
    }
}

impl AppConfig {
    /// File (if `ATELIER_CONFIG` is set), then environment overrides, then validation.
    pub fn load() -> AtelierResult<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        info!(
            "Configuration loaded: accounts={:?}, model={}, token_store={}",
            config.accounts,
            config.generation.model,
            if config.token_store.path.is_empty() { "memory" } else { "file" }
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AtelierResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AtelierError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> AtelierResult<Self> {
        toml::from_str(raw).map_err(|e| AtelierError::Config(format!("invalid config: {}", e)))
    }

    /// Apply `ATELIER_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, target: &mut String| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };
        text("ATELIER_HOST", &mut self.server.host);
        text("ATELIER_ALLOWED_ORIGIN", &mut self.server.allowed_origin);
        text("ATELIER_API_KEY", &mut self.generation.api_key);
        text("ATELIER_GENERATION_BASE_URL", &mut self.generation.base_url);
        text("ATELIER_MODEL", &mut self.generation.model);
        text("ATELIER_SYSTEM_PROMPT", &mut self.generation.system_prompt);
        text("ATELIER_OAUTH_CLIENT_ID", &mut self.oauth.client_id);
        text("ATELIER_OAUTH_CLIENT_SECRET", &mut self.oauth.client_secret);
        text("ATELIER_OAUTH_REDIRECT_URI", &mut self.oauth.redirect_uri);
        text("ATELIER_MAIL_QUERY", &mut self.integrations.mail_query);
        text("ATELIER_TOKEN_DIR", &mut self.token_store.path);
        text("ATELIER_REPO_OWNER", &mut self.repository.owner);
        text("ATELIER_REPO_NAME", &mut self.repository.repo);
        text("ATELIER_REPO_BRANCH", &mut self.repository.branch);
        text("ATELIER_REPO_TOKEN", &mut self.repository.token);

        if let Some(port) = lookup("ATELIER_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid ATELIER_PORT: {}", port),
            }
        }
        if let Some(max_tokens) = lookup("ATELIER_MAX_TOKENS") {
            match max_tokens.trim().parse() {
                Ok(value) => self.generation.max_tokens = value,
                Err(_) => warn!("Ignoring invalid ATELIER_MAX_TOKENS: {}", max_tokens),
            }
        }
        if let Some(days) = lookup("ATELIER_CALENDAR_WINDOW_DAYS") {
            match days.trim().parse() {
                Ok(value) => self.integrations.calendar_window_days = value,
                Err(_) => warn!("Ignoring invalid ATELIER_CALENDAR_WINDOW_DAYS: {}", days),
            }
        }
        if let Some(budget) = lookup("ATELIER_THINKING_BUDGET") {
            self.generation.thinking_budget = budget.trim().parse().ok().filter(|b| *b > 0);
        }
        if let Some(accounts) = lookup("ATELIER_ACCOUNTS") {
            self.accounts = accounts
                .split(',')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
        }
    }

    pub fn validate(&self) -> AtelierResult<()> {
        if self.accounts.is_empty() {
            return Err(AtelierError::Config("at least one account is required".into()));
        }
        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.as_str()) {
                return Err(AtelierError::Config(format!("duplicate account: {}", account)));
            }
        }
        if self.generation.max_tokens == 0 {
            return Err(AtelierError::Config("max_tokens must be positive".into()));
        }
        if !(1..=MAX_CALENDAR_WINDOW_DAYS).contains(&self.integrations.calendar_window_days) {
            return Err(AtelierError::Config(format!(
                "calendar_window_days must be between 1 and {}",
                MAX_CALENDAR_WINDOW_DAYS
            )));
        }
        if self.integrations.mail_query.trim().is_empty() {
            return Err(AtelierError::Config("mail_query must not be empty".into()));
        }
        Ok(())
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            model: self.generation.model.clone(),
            max_tokens: self.generation.max_tokens,
            system_prompt: self.generation.system_prompt.clone(),
            thinking_budget: self.generation.thinking_budget,
        }
    }

    pub fn oauth_settings(&self) -> OAuthSettings {
        OAuthSettings {
            client_id: self.oauth.client_id.clone(),
            client_secret: self.oauth.client_secret.clone(),
            redirect_uri: self.oauth.redirect_uri.clone(),
            scopes: self.oauth.scopes.clone(),
            auth_url: self.oauth.auth_url.clone(),
            token_url: self.oauth.token_url.clone(),
            userinfo_url: self.oauth.userinfo_url.clone(),
        }
    }

    pub fn calendar_client(&self) -> GoogleCalendarClient {
        GoogleCalendarClient::new(self.oauth.api_base.clone())
            .with_window_days(self.integrations.calendar_window_days)
    }

    pub fn mail_client(&self) -> GmailClient {
        GmailClient::new(self.oauth.api_base.clone())
            .with_query(self.integrations.mail_query.clone())
    }

    /// `None` until owner, repo and token are all set.
    pub fn repository_settings(&self) -> Option<RepositorySettings> {
        let repo = &self.repository;
        if repo.owner.is_empty() || repo.repo.is_empty() || repo.token.is_empty() {
            return None;
        }
        Some(RepositorySettings {
            api_base: repo.api_base.clone(),
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            branch: repo.branch.clone(),
            token: repo.token.clone(),
        })
    }

    pub fn token_dir(&self) -> Option<PathBuf> {
        let path = self.token_store.path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
