//! Credential lifecycle

pub mod manager;
pub mod provider;
pub mod types;

pub use manager::{decode_state, encode_state, CredentialManager, REFRESH_MARGIN_SECS};
pub use provider::{default_google_scopes, GoogleOAuthProvider, OAuthProvider, OAuthSettings};
pub use types::{
    expiry_after, AccountCredential, AccountStatus, AuthState, RefreshError, TokenGrant,
    MAX_TOKEN_LIFETIME_SECS,
};
