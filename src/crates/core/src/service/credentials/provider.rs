//! OAuth provider seam
//!
//! `GoogleOAuthProvider` talks to Google's consent, token and userinfo endpoints.

use super::types::{RefreshError, TokenGrant};
use crate::util::errors::{AtelierError, AtelierResult};
use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Prefix for token store keys.
    fn name(&self) -> &str;

    /// Consent URL carrying `state` back to the callback.
    fn authorization_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> AtelierResult<TokenGrant>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RefreshError>;

    /// Display label (email) of the identity behind `access_token`.
    async fn fetch_identity(&self, access_token: &str) -> AtelierResult<String>;
}

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl OAuthSettings {
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: default_google_scopes(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
        }
    }
}

pub fn default_google_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/calendar.readonly".to_string(),
        "https://www.googleapis.com/auth/gmail.readonly".to_string(),
        "https://www.googleapis.com/auth/userinfo.email".to_string(),
    ]
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|error| match &self.error_description {
            Some(description) => format!("{}: {}", error, description),
            None => error.clone(),
        })
    }

    fn into_grant(self) -> Result<TokenGrant, String> {
        let access_token = self
            .access_token
            .ok_or_else(|| "token response has no access_token".to_string())?;
        Ok(TokenGrant {
            access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in.unwrap_or(3600),
            scope: self.scope,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Clone)]
pub struct GoogleOAuthProvider {
    client: reqwest::Client,
    settings: OAuthSettings,
}

impl GoogleOAuthProvider {
    pub fn new(settings: OAuthSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    async fn post_token(&self, params: &[(&str, &str)]) -> reqwest::Result<(StatusCode, String)> {
        let response = self
            .client
            .post(&self.settings.token_url)
            .form(params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

/// Decide what a token-endpoint answer to a refresh means.
///
/// Only an OAuth `error` body or a 400/401 rejects the refresh token. Everything else,
/// outages included, is transient.
fn classify_refresh(status: StatusCode, body: &str) -> Result<TokenGrant, RefreshError> {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(RefreshError::Transport(format!(
            "token endpoint unavailable ({}): {}",
            status, body
        )));
    }

    let response: Option<TokenResponse> = serde_json::from_str(body).ok();
    if let Some(message) = response.as_ref().and_then(TokenResponse::error_message) {
        return Err(RefreshError::Rejected(message));
    }
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        return Err(RefreshError::Rejected(format!(
            "token endpoint refused refresh ({}): {}",
            status, body
        )));
    }
    if !status.is_success() {
        return Err(RefreshError::Transport(format!(
            "unexpected token endpoint status ({}): {}",
            status, body
        )));
    }
    match response {
        Some(response) => response.into_grant().map_err(RefreshError::Transport),
        None => Err(RefreshError::Transport(format!(
            "unreadable token response: {}",
            body
        ))),
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        let scope = self.settings.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.settings.auth_url,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> AtelierResult<TokenGrant> {
        let (status, body) = self
            .post_token(&[
                ("code", code),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let response: TokenResponse = serde_json::from_str(&body)?;
        if let Some(message) = response.error_message() {
            return Err(AtelierError::provider(message));
        }
        if !status.is_success() {
            return Err(AtelierError::provider(format!(
                "code exchange failed ({}): {}",
                status, body
            )));
        }
        response.into_grant().map_err(AtelierError::Provider)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RefreshError> {
        let (status, body) = self
            .post_token(&[
                ("refresh_token", refresh_token),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        classify_refresh(status, &body)
    }

    async fn fetch_identity(&self, access_token: &str) -> AtelierResult<String> {
        let response = self
            .client
            .get(&self.settings.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?;
        let info: UserInfo = response.json().await?;
        debug!("Fetched linked identity");
        info.email
            .or(info.name)
            .ok_or_else(|| AtelierError::provider("userinfo has neither email nor name"))
    }
}
