//! Display identity from a bearer assertion.
//!
//! The assertion is decoded, not verified; the outer proxy owns authentication.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::debug;
use serde::{Deserialize, Serialize};

pub const ANONYMOUS_EMAIL: &str = "anonymous@localhost";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    email: Option<String>,
    name: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            email: ANONYMOUS_EMAIL.to_string(),
            name: None,
        }
    }

    /// Resolve from an `Authorization` header value; anything unreadable is anonymous.
    pub fn from_headers(authorization: Option<&str>) -> Self {
        authorization
            .and_then(decode_bearer)
            .unwrap_or_else(Self::anonymous)
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

fn decode_bearer(value: &str) -> Option<Identity> {
    let token = value.trim().strip_prefix("Bearer ")?.trim();
    let payload = token.split('.').nth(1)?;
    let bytes = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Identity assertion is not base64: {}", e);
            return None;
        }
    };
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    let email = claims.email.filter(|e| !e.trim().is_empty())?;
    Some(Identity {
        email,
        name: claims.name.filter(|n| !n.trim().is_empty()),
    })
}
