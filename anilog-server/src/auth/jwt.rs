use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Issues and validates HS256-signed access and refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn generate_access_token(&self, user_id: i64, username: &str) -> Result<String, TokenError> {
        self.sign(user_id, Some(username.to_string()), TokenKind::Access, self.access_ttl)
    }

    pub fn generate_refresh_token(&self, user_id: i64) -> Result<String, TokenError> {
        self.sign(user_id, None, TokenKind::Refresh, self.refresh_ttl)
    }

    fn sign(
        &self,
        user_id: i64,
        username: Option<String>,
        typ: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username,
            typ,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            // Two tokens issued in the same second must still differ.
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    pub fn user_id_from_token(&self, token: &str) -> Option<i64> {
        self.validate_token(token).ok().and_then(|c| c.user_id())
    }

    /// True for expired tokens and for tokens that fail validation at all.
    pub fn is_token_expired(&self, token: &str) -> bool {
        self.validate_token(token).is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::minutes(15), Duration::days(7))
    }

    #[test]
    fn test_access_token_carries_user_and_kind() {
        let tokens = service();
        let token = tokens.generate_access_token(42, "gintoki").unwrap();
        let claims = tokens.validate_token(&token).unwrap();

        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.username.as_deref(), Some("gintoki"));
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(tokens.user_id_from_token(&token), Some(42));
        assert!(!tokens.is_token_expired(&token));
    }

    #[test]
    fn test_refresh_tokens_are_unique_and_have_no_username() {
        let tokens = service();
        let a = tokens.generate_refresh_token(7).unwrap();
        let b = tokens.generate_refresh_token(7).unwrap();
        assert_ne!(a, b);

        let claims = tokens.validate_token(&a).unwrap();
        assert_eq!(claims.typ, TokenKind::Refresh);
        assert!(claims.username.is_none());
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let tokens = TokenService::new(SECRET, Duration::minutes(-5), Duration::days(7));
        let token = tokens.generate_access_token(1, "shinpachi").unwrap();

        assert_eq!(tokens.validate_token(&token).unwrap_err(), TokenError::Expired);
        assert!(tokens.is_token_expired(&token));
        assert_eq!(tokens.user_id_from_token(&token), None);
    }

    #[test]
    fn test_foreign_or_garbage_tokens_are_invalid() {
        let other = TokenService::new(
            "another-secret-that-is-also-32-bytes!!",
            Duration::minutes(15),
            Duration::days(7),
        );
        let token = other.generate_access_token(1, "kagura").unwrap();
        let tokens = service();

        assert_eq!(tokens.validate_token(&token).unwrap_err(), TokenError::Invalid);
        assert_eq!(tokens.validate_token("not.a.jwt").unwrap_err(), TokenError::Invalid);
        assert!(tokens.is_token_expired("garbage"));
    }
}
