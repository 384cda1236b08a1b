//! Access token claim decoding.
//!
//! The access token is a signed JWT issued by the server. The client only
//! decodes the payload segment - username, role names, expiry - for display
//! and routing decisions. The signature is never checked here and nothing
//! client-side trusts these claims for authorization; the server
//! re-validates every request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Role names embedded in the token. Every authenticated user is
/// implicitly an employee.
pub const ROLE_EMPLOYEE: &str = "Employee";
pub const ROLE_MANAGER: &str = "Manager";
pub const ROLE_ADMIN: &str = "Admin";

#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("token is not a three-part JWT")]
    Malformed,

    #[error("payload is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload is not valid claims JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "UserInfo")]
    user_info: UserInfo,
    #[serde(default)]
    exp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    username: String,
    #[serde(default)]
    roles: Vec<String>,
}

/// Identity claims carried by the access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaims {
    pub username: String,
    pub roles: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserClaims {
    /// Decode the payload segment of a JWT without verifying the signature.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let mut parts = token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(ClaimsError::Malformed),
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload)?;
        let parsed: Payload = serde_json::from_slice(&bytes)?;
        let expires_at = parsed
            .exp
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        Ok(Self {
            username: parsed.user_info.username,
            roles: parsed.user_info.roles,
            expires_at,
        })
    }

    pub fn is_manager(&self) -> bool {
        self.roles.iter().any(|role| role == ROLE_MANAGER)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ROLE_ADMIN)
    }

    /// Highest role for display: Admin over Manager over Employee.
    pub fn status(&self) -> &'static str {
        if self.is_admin() {
            ROLE_ADMIN
        } else if self.is_manager() {
            ROLE_MANAGER
        } else {
            ROLE_EMPLOYEE
        }
    }

    /// True when the embedded expiry has passed. Tokens without an `exp`
    /// claim are treated as unexpired; the server still rejects them when
    /// it disagrees.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() > at,
            None => false,
        }
    }
}

/// Build an unsigned token with the given claims. The signature segment is
/// junk, which is fine: decoding never checks it.
#[cfg(test)]
pub(crate) fn test_token(username: &str, roles: &[&str], exp: Option<i64>) -> String {
    let payload = serde_json::json!({
        "UserInfo": { "username": username, "roles": roles },
        "exp": exp,
    });
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
    format!("{header}.{body}.sig")
}
