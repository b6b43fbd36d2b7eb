use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored per account under `<provider>:<accountId>`.
///
/// Always written whole; a refresh builds a new record rather than patching fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCredential {
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Display label of the linked identity.
    #[serde(default)]
    pub email: Option<String>,
    pub connected_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl AccountCredential {
    /// The stored access token, if it is still good for at least `margin`.
    pub fn usable_access_token(&self, now: DateTime<Utc>, margin: chrono::Duration) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if expires_at - margin > now => Some(token.as_str()),
            _ => None,
        }
    }

    /// A copy carrying a refreshed access token; everything else is preserved.
    pub fn refreshed(&self, grant: &TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            refresh_token: self.refresh_token.clone(),
            access_token: Some(grant.access_token.clone()),
            expires_at: Some(expiry_after(now, grant.expires_in)),
            email: self.email.clone(),
            connected_at: self.connected_at,
            scope: grant.scope.clone().or_else(|| self.scope.clone()),
        }
    }
}

/// Longest access-token lifetime taken at face value (100 years).
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// `now + expires_in` seconds, with the lifetime capped at `MAX_TOKEN_LIFETIME_SECS`.
pub fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    chrono::TimeDelta::try_seconds(expires_in.min(MAX_TOKEN_LIFETIME_SECS))
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(now)
}

/// Tokens issued by the provider for a code exchange or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Only meaningful on the initial exchange; refreshes keep the stored one.
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The provider refused the refresh token; it will not work again.
    #[error("refresh rejected: {0}")]
    Rejected(String),
    /// The provider could not be reached or answered unintelligibly.
    #[error("refresh transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    pub account: String,
    pub connected: bool,
    pub email: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
}

/// Carried through the provider's consent screen in the opaque `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub account: String,
    pub nonce: String,
}
