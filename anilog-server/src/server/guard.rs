use crate::auth::{TokenError, TokenKind, TokenService};
use crate::error::{ApiError, ApiResult};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use tracing::debug;

pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Checks that the bearer token belongs to `user_id`.
///
/// A present `X-Refresh-Token` header must itself be valid. The access token
/// is then read from `Authorization: Bearer <token>`.
pub fn authorize_owner(tokens: &TokenService, headers: &HeaderMap, user_id: i64) -> ApiResult<()> {
    if let Some(refresh) = headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        if tokens.is_token_expired(refresh) {
            return Err(ApiError::unauthorized("Refresh token has expired"));
        }
    }

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid Authorization header"))?;

    let claims = tokens.validate_token(token.trim()).map_err(|e| match e {
        TokenError::Expired => ApiError::unauthorized("Token has expired"),
        _ => ApiError::unauthorized("Invalid token"),
    })?;
    if claims.typ != TokenKind::Access {
        debug!("Non-access token presented as bearer credential");
        return Err(ApiError::unauthorized("Invalid token"));
    }

    match claims.user_id() {
        Some(id) if id == user_id => Ok(()),
        other => {
            debug!("Token subject {:?} does not match user {}", other, user_id);
            Err(ApiError::forbidden("User ID mismatch"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "a-test-secret-that-is-at-least-32-bytes";

    fn tokens() -> TokenService {
        TokenService::new(SECRET, Duration::minutes(15), Duration::days(7))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_owner_token_is_accepted() {
        let tokens = tokens();
        let access = tokens.generate_access_token(7, "yuki").unwrap();
        assert!(authorize_owner(&tokens, &bearer(&access), 7).is_ok());
    }

    #[test]
    fn test_mismatched_user_is_forbidden() {
        let tokens = tokens();
        let access = tokens.generate_access_token(7, "yuki").unwrap();
        let err = authorize_owner(&tokens, &bearer(&access), 8).unwrap_err();
        assert_eq!(err.to_string(), "User ID mismatch");
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let tokens = tokens();
        let err = authorize_owner(&tokens, &HeaderMap::new(), 1).unwrap_err();
        assert_eq!(err.to_string(), "Missing or invalid Authorization header");

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(matches!(
            authorize_owner(&tokens, &headers, 1).unwrap_err(),
            ApiError::Unauthorized(_)
        ));

        let err = authorize_owner(&tokens, &bearer("not.a.jwt"), 1).unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn test_refresh_token_is_not_a_bearer_credential() {
        let tokens = tokens();
        let refresh = tokens.generate_refresh_token(7).unwrap();
        let err = authorize_owner(&tokens, &bearer(&refresh), 7).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn test_expired_tokens_are_rejected() {
        let tokens = tokens();
        let stale = TokenService::new(SECRET, Duration::minutes(-5), Duration::days(-1));

        let access = stale.generate_access_token(3, "aoi").unwrap();
        let err = authorize_owner(&tokens, &bearer(&access), 3).unwrap_err();
        assert_eq!(err.to_string(), "Token has expired");

        let fresh = tokens.generate_access_token(3, "aoi").unwrap();
        let mut headers = bearer(&fresh);
        let refresh = stale.generate_refresh_token(3).unwrap();
        headers.insert(REFRESH_TOKEN_HEADER, HeaderValue::from_str(&refresh).unwrap());
        let err = authorize_owner(&tokens, &headers, 3).unwrap_err();
        assert_eq!(err.to_string(), "Refresh token has expired");
    }
}
