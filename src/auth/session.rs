/// Session lifecycle
///
/// A refresh token is valid only while both hold:
/// - its signature (and `exp`, when present) verifies
/// - its digest is present in the refresh token store
///
/// Removing the record revokes the token even if it is cryptographically
/// still good. An expired token is purged from the store the first time it
/// is presented.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::jwt::{TokenKind, TokenOutcome, TokenSigner};
use crate::auth::refresh_token::hash_token;
use crate::domain::User;
use crate::error::{AppError, AuthError};
use crate::store::RefreshTokenStore;

#[derive(Clone)]
pub struct Authenticator {
    signer: TokenSigner,
    tokens: Arc<dyn RefreshTokenStore>,
}

impl Authenticator {
    pub fn new(signer: TokenSigner, tokens: Arc<dyn RefreshTokenStore>) -> Self {
        Self { signer, tokens }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, AppError> {
        self.signer.access_token(user)
    }

    pub fn issue_access_token_with_ttl(&self, user: &User, ttl: i64) -> Result<String, AppError> {
        self.signer.access_token_with_ttl(user, ttl)
    }

    /// Pure check; no store access.
    pub fn verify_access_token(&self, token: &str) -> TokenOutcome {
        self.signer.verify(TokenKind::Access, token)
    }

    /// Sign a refresh token for `user` with the configured lifetime and record it.
    pub async fn issue_refresh_token(&self, user: &User) -> Result<String, AppError> {
        self.issue_refresh_token_with_ttl(user, self.signer.refresh_token_ttl())
            .await
    }

    pub async fn issue_refresh_token_with_ttl(
        &self,
        user: &User,
        ttl: Option<i64>,
    ) -> Result<String, AppError> {
        let claims = self.signer.claims_for(user, ttl);
        let token = self.signer.sign(TokenKind::Refresh, &claims)?;
        self.tokens.insert_token(&hash_token(&token)).await?;

        tracing::debug!(user_id = %user.id, "Refresh token issued");
        Ok(token)
    }

    pub async fn is_stored(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.tokens.find_token(&hash_token(token)).await?.is_some())
    }

    /// Check a presented refresh token against the store and its signature.
    ///
    /// # Errors
    /// - `TokenInvalid` if the token is unknown to the store or fails verification
    /// - `TokenExpired` if it has expired; the record is deleted first
    pub async fn verify_refresh_token(&self, token: &str) -> Result<Claims, AppError> {
        let digest = hash_token(token);

        if self.tokens.find_token(&digest).await?.is_none() {
            tracing::warn!("Refresh token not found in store");
            return Err(AuthError::TokenInvalid.into());
        }

        match self.signer.verify(TokenKind::Refresh, token) {
            TokenOutcome::Valid(claims) => Ok(claims),
            TokenOutcome::Expired => {
                self.tokens.remove_token(&digest).await?;
                tracing::info!("Expired refresh token purged");
                Err(AuthError::TokenExpired.into())
            }
            TokenOutcome::Invalid => Err(AuthError::TokenInvalid.into()),
        }
    }

    /// New access token with the identity carried by verified refresh claims.
    pub fn renew_access_token(&self, claims: &Claims) -> Result<String, AppError> {
        tracing::info!(user_id = %claims.id, "Access token renewed");
        self.signer.renew_access_token(claims)
    }

    /// Delete a refresh token (logout).
    ///
    /// # Errors
    /// `TokenNotFound` if the store does not hold it
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        match self.tokens.remove_token(&hash_token(token)).await? {
            Some(_) => Ok(()),
            None => Err(AuthError::TokenNotFound.into()),
        }
    }

    /// First half of a rotation: `presented` must be stored, valid, and
    /// belong to `user`. Nothing is written unless the token has expired, in
    /// which case it is purged.
    ///
    /// The caller persists its own changes and then hands the result to
    /// [`Authenticator::complete_rotation`]. If the caller's write fails the
    /// presented token stays usable.
    pub async fn begin_rotation(
        &self,
        presented: &str,
        user: &User,
    ) -> Result<PendingRotation, AppError> {
        let digest = hash_token(presented);

        if self.tokens.find_token(&digest).await?.is_none() {
            tracing::warn!(user_id = %user.id, "Rotation with unknown refresh token");
            return Err(AuthError::TokenInvalid.into());
        }

        match self.signer.verify(TokenKind::Refresh, presented) {
            TokenOutcome::Valid(claims) if claims.id == user.id => Ok(PendingRotation {
                digest,
                user_id: user.id,
            }),
            TokenOutcome::Valid(claims) => {
                tracing::warn!(
                    user_id = %user.id,
                    token_owner = %claims.id,
                    "Rotation with another user's refresh token"
                );
                Err(AuthError::TokenInvalid.into())
            }
            TokenOutcome::Expired => {
                self.tokens.remove_token(&digest).await?;
                Err(AuthError::TokenExpired.into())
            }
            TokenOutcome::Invalid => Err(AuthError::TokenInvalid.into()),
        }
    }

    /// Second half of a rotation: drop the old token and issue one carrying
    /// `user`'s current claims.
    ///
    /// # Errors
    /// `TokenInvalid` if the old token was revoked in the meantime, or if
    /// `user` is not the user the rotation was started for
    pub async fn complete_rotation(
        &self,
        pending: PendingRotation,
        user: &User,
    ) -> Result<String, AppError> {
        if pending.user_id != user.id {
            return Err(AuthError::TokenInvalid.into());
        }
        if self.tokens.remove_token(&pending.digest).await?.is_none() {
            tracing::warn!(user_id = %user.id, "Refresh token revoked during rotation");
            return Err(AuthError::TokenInvalid.into());
        }

        let token = self.issue_refresh_token(user).await?;
        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(token)
    }
}

/// A refresh token that passed the rotation checks and is waiting to be
/// swapped for a new one.
#[derive(Debug)]
#[must_use]
pub struct PendingRotation {
    digest: String,
    user_id: Uuid,
}
