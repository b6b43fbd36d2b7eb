//! Credential lifecycle manager
//!
//! Caches, refreshes and invalidates delegated access tokens for a configured set of accounts.

use super::provider::OAuthProvider;
use super::types::{expiry_after, AccountCredential, AccountStatus, AuthState, RefreshError};
use crate::infrastructure::storage::TokenStore;
use crate::util::errors::{AtelierError, AtelierResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Access tokens expiring within this window are refreshed early.
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

pub struct CredentialManager {
    store: Arc<dyn TokenStore>,
    provider: Arc<dyn OAuthProvider>,
    accounts: Vec<String>,
}

impl CredentialManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        provider: Arc<dyn OAuthProvider>,
        accounts: Vec<String>,
    ) -> Self {
        Self {
            store,
            provider,
            accounts,
        }
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    fn store_key(&self, account: &str) -> String {
        format!("{}:{}", self.provider.name(), account)
    }

    fn ensure_known(&self, account: &str) -> AtelierResult<()> {
        if self.accounts.iter().any(|a| a == account) {
            Ok(())
        } else {
            Err(AtelierError::validation(format!("unknown account: {}", account)))
        }
    }

    async fn load(&self, account: &str) -> AtelierResult<Option<AccountCredential>> {
        let Some(raw) = self.store.get(&self.store_key(account)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn save(&self, account: &str, record: &AccountCredential) -> AtelierResult<()> {
        let raw = serde_json::to_string(record)?;
        self.store.put(&self.store_key(account), raw).await
    }

    /// A currently valid access token for `account`, or `None`.
    ///
    /// Never fails: a missing record, an unreadable store or a failed refresh all read as
    /// "no token available". A rejected refresh deletes the record.
    pub async fn get_access_token(&self, account: &str) -> Option<String> {
        let record = match self.load(account).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                error!("Failed to read credential record: account={}, error={}", account, e);
                return None;
            }
        };
        if record.refresh_token.is_empty() {
            return None;
        }

        let now = Utc::now();
        let margin = chrono::Duration::seconds(REFRESH_MARGIN_SECS);
        if let Some(token) = record.usable_access_token(now, margin) {
            return Some(token.to_string());
        }

        debug!("Refreshing access token: account={}", account);
        match self.provider.refresh(&record.refresh_token).await {
            Ok(grant) => {
                let updated = record.refreshed(&grant, Utc::now());
                if let Err(e) = self.save(account, &updated).await {
                    // The token is still valid for this request; the next call refreshes again.
                    error!("Failed to persist refreshed credential: account={}, error={}", account, e);
                }
                Some(grant.access_token)
            }
            Err(RefreshError::Rejected(reason)) => {
                warn!(
                    "Refresh rejected, deleting credential record: account={}, reason={}",
                    account, reason
                );
                if let Err(e) = self.store.delete(&self.store_key(account)).await {
                    error!("Failed to delete credential record: account={}, error={}", account, e);
                }
                None
            }
            Err(RefreshError::Transport(reason)) => {
                warn!("Refresh failed, keeping record: account={}, reason={}", account, reason);
                None
            }
        }
    }

    /// Consent URL for linking `account`.
    pub fn begin_authorization(&self, account: &str) -> AtelierResult<String> {
        self.ensure_known(account)?;
        let state = encode_state(&AuthState {
            account: account.to_string(),
            nonce: uuid::Uuid::new_v4().to_string(),
        })?;
        Ok(self.provider.authorization_url(&state))
    }

    /// Finish the consent flow: exchange the code and create the account's record.
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
    ) -> AtelierResult<AccountStatus> {
        let state = decode_state(state)?;
        self.ensure_known(&state.account)?;

        let grant = self.provider.exchange_code(code).await?;
        let refresh_token = grant.refresh_token.clone().ok_or_else(|| {
            AtelierError::provider("authorization did not grant a refresh token")
        })?;

        let email = match self.provider.fetch_identity(&grant.access_token).await {
            Ok(email) => Some(email),
            Err(e) => {
                warn!("Failed to fetch linked identity: account={}, error={}", state.account, e);
                None
            }
        };

        let now = Utc::now();
        let record = AccountCredential {
            refresh_token,
            access_token: Some(grant.access_token),
            expires_at: Some(expiry_after(now, grant.expires_in)),
            email,
            connected_at: now,
            scope: grant.scope,
        };
        self.save(&state.account, &record).await?;
        info!("Account connected: account={}", state.account);

        Ok(AccountStatus {
            account: state.account,
            connected: true,
            email: record.email,
            connected_at: Some(record.connected_at),
        })
    }

    /// Remove the account's record. Disconnecting twice is fine.
    pub async fn disconnect(&self, account: &str) -> AtelierResult<()> {
        self.ensure_known(account)?;
        self.store.delete(&self.store_key(account)).await?;
        info!("Account disconnected: account={}", account);
        Ok(())
    }

    /// Stored connection state of every configured account. No network calls.
    pub async fn account_status(&self) -> Vec<AccountStatus> {
        let mut statuses = Vec::with_capacity(self.accounts.len());
        for account in &self.accounts {
            let record = match self.load(account).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Unreadable credential record: account={}, error={}", account, e);
                    None
                }
            };
            statuses.push(AccountStatus {
                account: account.clone(),
                connected: record.is_some(),
                email: record.as_ref().and_then(|r| r.email.clone()),
                connected_at: record.as_ref().map(|r| r.connected_at),
            });
        }
        statuses
    }
}

pub fn encode_state(state: &AuthState) -> AtelierResult<String> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(state)?))
}

pub fn decode_state(raw: &str) -> AtelierResult<AuthState> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw.trim_end_matches('='))
        .map_err(|_| AtelierError::validation("malformed authorization state"))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AtelierError::validation("malformed authorization state"))
}
