/// JWT Token Generation and Validation
///
/// Access and refresh tokens are HS256 JWTs signed with separate secrets.
/// Verification never touches the store; it only needs the keys held here.

use std::collections::HashSet;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::domain::User;
use crate::error::{AppError, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Result of checking a token's signature and expiry
#[derive(Debug, Clone, PartialEq)]
pub enum TokenOutcome {
    Valid(Claims),
    Expired,
    Invalid,
}

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signs and verifies tokens. Built once from [`JwtSettings`] at start-up.
#[derive(Clone)]
pub struct TokenSigner {
    access: Keys,
    refresh: Keys,
    access_ttl: i64,
    refresh_ttl: Option<i64>,
    issuer: String,
    validation: Validation,
}

impl TokenSigner {
    /// # Errors
    /// Returns a configuration error if a secret is empty or a lifetime is
    /// not positive.
    pub fn new(settings: &JwtSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&settings.issuer]);
        // Expiry is checked on the decoded claims so refresh tokens may omit `exp`.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            access: Keys::from_secret(&settings.access_secret),
            refresh: Keys::from_secret(&settings.refresh_secret),
            access_ttl: settings.access_token_expiry,
            refresh_ttl: settings.refresh_token_expiry,
            issuer: settings.issuer.clone(),
            validation,
        })
    }

    pub fn refresh_token_ttl(&self) -> Option<i64> {
        self.refresh_ttl
    }

    fn keys(&self, kind: TokenKind) -> &Keys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn claims_for(&self, user: &User, expiry_seconds: Option<i64>) -> Claims {
        Claims::for_user(user, expiry_seconds, &self.issuer)
    }

    pub fn sign(&self, kind: TokenKind, claims: &Claims) -> Result<String, AppError> {
        Ok(encode(&Header::default(), claims, &self.keys(kind).encoding)?)
    }

    /// Access token for `user` with the configured lifetime
    pub fn access_token(&self, user: &User) -> Result<String, AppError> {
        self.access_token_with_ttl(user, self.access_ttl)
    }

    pub fn access_token_with_ttl(&self, user: &User, ttl: i64) -> Result<String, AppError> {
        let claims = self.claims_for(user, Some(ttl));
        self.sign(TokenKind::Access, &claims)
    }

    /// New access token carrying the identity of already-verified claims.
    pub fn renew_access_token(&self, claims: &Claims) -> Result<String, AppError> {
        self.sign(TokenKind::Access, &claims.reissue(Some(self.access_ttl)))
    }

    /// Check signature, issuer and expiry.
    pub fn verify(&self, kind: TokenKind, token: &str) -> TokenOutcome {
        let claims = match decode::<Claims>(token, &self.keys(kind).decoding, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(?kind, error = %e, "JWT validation error");
                return TokenOutcome::Invalid;
            }
        };

        if claims.is_expired() {
            return TokenOutcome::Expired;
        }
        TokenOutcome::Valid(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            access_secret: "test-access-secret-at-least-32-characters".to_string(),
            refresh_secret: "test-refresh-secret-at-least-32-characters".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: None,
            issuer: "test".to_string(),
        }
    }

    fn test_user() -> User {
        let mut user = User::new(
            "boggs".to_string(),
            "hash".to_string(),
            "boggs@example.com".to_string(),
        );
        user.nickname = Some("Boggs".to_string());
        user
    }

    #[test]
    fn test_generate_and_validate_token() {
        let signer = TokenSigner::new(&get_test_config()).unwrap();
        let user = test_user();

        let token = signer.access_token(&user).expect("Failed to generate token");
        match signer.verify(TokenKind::Access, &token) {
            TokenOutcome::Valid(claims) => {
                assert_eq!(claims.id, user.id);
                assert_eq!(claims.username, user.username);
                assert_eq!(claims.nickname, user.nickname);
                assert_eq!(claims.current_chat_id, user.current_chat);
                assert_eq!(claims.iss, "test");
            }
            other => panic!("Expected valid token, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_token() {
        let signer = TokenSigner::new(&get_test_config()).unwrap();
        assert_eq!(
            signer.verify(TokenKind::Access, "invalid.token.here"),
            TokenOutcome::Invalid
        );
    }

    #[test]
    fn test_tampered_token() {
        let signer = TokenSigner::new(&get_test_config()).unwrap();
        let token = signer.access_token(&test_user()).unwrap();

        let tampered = format!("{}X", token);
        assert_eq!(signer.verify(TokenKind::Access, &tampered), TokenOutcome::Invalid);
    }

    #[test]
    fn test_wrong_signature() {
        let signer = TokenSigner::new(&get_test_config()).unwrap();
        let mut other_config = get_test_config();
        other_config.access_secret = "a-completely-different-secret-value".to_string();
        let other = TokenSigner::new(&other_config).unwrap();

        let token = other.access_token(&test_user()).unwrap();
        assert_eq!(signer.verify(TokenKind::Access, &token), TokenOutcome::Invalid);
    }

    #[test]
    fn test_kinds_do_not_cross() {
        let signer = TokenSigner::new(&get_test_config()).unwrap();
        let user = test_user();
        let claims = signer.claims_for(&user, None);
        let refresh = signer.sign(TokenKind::Refresh, &claims).unwrap();

        assert_eq!(signer.verify(TokenKind::Access, &refresh), TokenOutcome::Invalid);
        assert!(matches!(
            signer.verify(TokenKind::Refresh, &refresh),
            TokenOutcome::Valid(_)
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let signer = TokenSigner::new(&get_test_config()).unwrap();
        let token = signer.access_token(&test_user()).unwrap();

        let mut config = get_test_config();
        config.issuer = "wrong-issuer".to_string();
        let other = TokenSigner::new(&config).unwrap();

        assert_eq!(other.verify(TokenKind::Access, &token), TokenOutcome::Invalid);
    }

    #[test]
    fn test_expired_token() {
        let signer = TokenSigner::new(&get_test_config()).unwrap();
        let mut claims = signer.claims_for(&test_user(), Some(60));
        claims.exp = Some(claims.iat - 1);
        let token = signer.sign(TokenKind::Access, &claims).unwrap();

        assert_eq!(signer.verify(TokenKind::Access, &token), TokenOutcome::Expired);
    }

    #[test]
    fn test_expiry_is_reported_only_for_valid_signatures() {
        let signer = TokenSigner::new(&get_test_config()).unwrap();
        let mut claims = signer.claims_for(&test_user(), Some(60));
        claims.exp = Some(claims.iat - 1);
        let token = signer.sign(TokenKind::Access, &claims).unwrap();

        assert_eq!(signer.verify(TokenKind::Refresh, &token), TokenOutcome::Invalid);
    }

    #[test]
    fn test_empty_secret_is_a_config_error() {
        let mut config = get_test_config();
        config.access_secret = String::new();
        assert!(TokenSigner::new(&config).is_err());
    }
}
