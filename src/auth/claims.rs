/// JWT Claims structure
///
/// Access and refresh tokens share one claim shape: the user's identity plus
/// the denormalised profile fields handlers need without a store lookup.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::User;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// User ID
    pub id: Uuid,
    pub username: String,
    pub nickname: Option<String>,
    pub current_chat_id: Option<Uuid>,
    /// Unique token ID; two tokens issued in the same second still differ
    pub jti: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp); absent for non-expiring refresh tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create claims for a user
    ///
    /// # Arguments
    /// * `user` - Token subject
    /// * `expiry_seconds` - Lifetime from now, `None` for no expiry
    /// * `issuer` - Issuer identifier
    pub fn for_user(user: &User, expiry_seconds: Option<i64>, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: user.id,
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            current_chat_id: user.current_chat,
            jti: Uuid::new_v4(),
            iat: now,
            exp: expiry_seconds.map(|ttl| now + ttl),
            iss: issuer.to_string(),
        }
    }

    /// Same identity, fresh `jti`/`iat`/`exp`.
    pub fn reissue(&self, expiry_seconds: Option<i64>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            jti: Uuid::new_v4(),
            iat: now,
            exp: expiry_seconds.map(|ttl| now + ttl),
            ..self.clone()
        }
    }

    /// A token is expired from the second its `exp` is reached.
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.exp, Some(exp) if exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}
