use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::coordinator::AccountName;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdentityError {
    #[error("Invalid identity token: {0}")]
    InvalidToken(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Claims issued by the identity service; `sub` is the account name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Supplies the verified account name behind a credential
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<AccountName, IdentityError>;
}

/// HS256 secret and token lifetime
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_hours: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, expiration_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours,
        }
    }

    /// Signs a token for an account. Used by the identity service side and
    /// by tests.
    #[instrument(skip(self))]
    pub fn issue_token(&self, account: &AccountName) -> Result<String, IdentityError> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiration_hours)).timestamp() as usize;

        let claims = IdentityClaims {
            sub: account.to_string(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| IdentityError::Signing(e.to_string()))
    }

    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<IdentityClaims, IdentityError> {
        decode::<IdentityClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(account = %data.claims.sub, exp = data.claims.exp, "Identity token decoded");
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode identity token");
            IdentityError::InvalidToken(e.to_string())
        })
    }
}

/// Identity provider backed by signed JWTs
pub struct JwtIdentityProvider {
    config: TokenConfig,
}

impl JwtIdentityProvider {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<AccountName, IdentityError> {
        let claims = self.config.validate_token(credential)?;
        if claims.sub.trim().is_empty() {
            return Err(IdentityError::InvalidToken("empty subject".to_string()));
        }
        Ok(AccountName::new(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_and_verify() {
        let config = TokenConfig::new("test-secret", 1);
        let token = config.issue_token(&"alice".into()).unwrap();

        let provider = JwtIdentityProvider::new(config);
        assert_eq!(provider.verify(&token).await.unwrap(), AccountName::from("alice"));
    }

    #[tokio::test]
    async fn test_token_from_other_secret_is_rejected() {
        let token = TokenConfig::new("one", 1).issue_token(&"alice".into()).unwrap();
        let provider = JwtIdentityProvider::new(TokenConfig::new("two", 1));

        assert!(matches!(
            provider.verify(&token).await,
            Err(IdentityError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let config = TokenConfig::new("test-secret", -2);
        let token = config.issue_token(&"alice".into()).unwrap();

        assert!(config.validate_token(&token).is_err());
    }

    #[test]
    fn test_garbage_token() {
        let config = TokenConfig::new("test-secret", 1);
        assert!(matches!(
            config.validate_token("invalid.token.here"),
            Err(IdentityError::InvalidToken(_))
        ));
    }
}
