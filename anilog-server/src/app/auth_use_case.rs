use crate::app::{is_blank, user_conflict, validate_age};
use crate::auth::{hash_refresh_token, validate_password, PasswordHasher, TokenKind, TokenService};
use crate::error::{ApiError, ApiResult};
use crate::observability::metrics;
use anilog_core::{RefreshToken, Storage, User};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const INVALID_CREDENTIALS: &str = "Invalid email/username or password";
const INVALID_REFRESH: &str = "Invalid or expired refresh token";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email_address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub user_id: i64,
    pub username: String,
}

/// Registration, login, token refresh and logout.
pub struct AuthUseCase {
    storage: Arc<dyn Storage>,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl AuthUseCase {
    pub fn new(storage: Arc<dyn Storage>, hasher: PasswordHasher, tokens: TokenService) -> Self {
        Self {
            storage,
            hasher,
            tokens,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> ApiResult<User> {
        let email = match request.email_address.as_deref() {
            Some(email) if !email.trim().is_empty() => email.trim().to_lowercase(),
            _ => return Err(ApiError::bad_request("Email address is required")),
        };
        let username = match request.username.as_deref() {
            Some(username) if !username.trim().is_empty() => username.trim().to_string(),
            _ => return Err(ApiError::bad_request("Username is required")),
        };
        let password = request.password.unwrap_or_default();
        validate_password(&password)?;
        validate_age(request.age)?;

        if self.storage.get_user_by_username(&username).await?.is_some() {
            return Err(ApiError::conflict("Username already exists"));
        }
        if self.storage.get_user_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("Email address already exists"));
        }

        let password_hash = self.hasher.hash(&password).await?;
        let mut user = User::new(&username, &email, password_hash);
        user.age = request.age;

        // A concurrent registration can still win the race on the unique index.
        self.storage
            .create_user(&mut user)
            .await
            .map_err(user_conflict)?;

        metrics::auth::registered();
        info!("Registered user {}", user.username);
        Ok(user)
    }

    pub async fn username_available(&self, username: Option<&str>) -> ApiResult<bool> {
        let username = match username {
            Some(u) if !u.trim().is_empty() => u.trim(),
            _ => return Err(ApiError::bad_request("Username is required")),
        };
        Ok(self.storage.get_user_by_username(username).await?.is_none())
    }

    pub async fn email_available(&self, email: Option<&str>) -> ApiResult<bool> {
        let email = match email {
            Some(e) if !e.trim().is_empty() => e.trim().to_lowercase(),
            _ => return Err(ApiError::bad_request("Email address is required")),
        };
        Ok(self.storage.get_user_by_email(&email).await?.is_none())
    }

    pub async fn login(&self, request: LoginRequest) -> ApiResult<LoginResponse> {
        if is_blank(request.email_or_username.as_deref()) || is_blank(request.password.as_deref()) {
            return Err(ApiError::bad_request("Email/Username and password are required"));
        }
        let identifier = request.email_or_username.unwrap_or_default();
        let identifier = identifier.trim();
        let password = request.password.unwrap_or_default();

        let user = match self.storage.get_user_by_username(identifier).await? {
            Some(user) => Some(user),
            None => {
                self.storage
                    .get_user_by_email(&identifier.to_lowercase())
                    .await?
            }
        };

        let verified = match &user {
            Some(user) => self.hasher.verify(&password, &user.password_hash).await?,
            None => false,
        };
        let user = match user {
            Some(user) if verified => user,
            _ => {
                metrics::auth::login_failure();
                debug!("Login rejected for '{}'", identifier);
                return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
            }
        };
        let user_id = user
            .id
            .ok_or_else(|| ApiError::internal("stored user has no id"))?;

        let access_token = self
            .tokens
            .generate_access_token(user_id, &user.username)
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let refresh_token = self
            .tokens
            .generate_refresh_token(user_id)
            .map_err(|e| ApiError::internal(e.to_string()))?;

        // One live refresh token per user: logging in revokes the previous ones.
        self.storage.delete_refresh_tokens_for_user(user_id).await?;
        let now = Utc::now();
        let mut stored = RefreshToken {
            id: None,
            token_hash: hash_refresh_token(&refresh_token),
            user_id,
            expires_at: now + self.tokens.refresh_ttl(),
            created_at: now,
        };
        self.storage.save_refresh_token(&mut stored).await?;

        metrics::auth::login_success();
        info!("User {} logged in", user.username);
        Ok(LoginResponse {
            access_token,
            refresh_token,
            user_id,
            username: user.username,
        })
    }

    pub async fn refresh(&self, request: RefreshRequest) -> ApiResult<RefreshResponse> {
        let token = match request.refresh_token.as_deref() {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => return Err(ApiError::bad_request("Refresh token is required")),
        };

        match self.refresh_inner(&token).await? {
            Some(response) => {
                metrics::auth::refresh_success();
                Ok(response)
            }
            None => {
                metrics::auth::refresh_failure();
                Err(ApiError::unauthorized(INVALID_REFRESH))
            }
        }
    }

    async fn refresh_inner(&self, token: &str) -> ApiResult<Option<RefreshResponse>> {
        let claims = match self.tokens.validate_token(token) {
            Ok(claims) if claims.typ == TokenKind::Refresh => claims,
            Ok(_) => {
                debug!("Access token presented to refresh endpoint");
                return Ok(None);
            }
            Err(e) => {
                debug!("Refresh token rejected: {}", e);
                return Ok(None);
            }
        };

        let token_hash = hash_refresh_token(token);
        let stored = match self.storage.get_refresh_token(&token_hash).await? {
            Some(stored) => stored,
            None => return Ok(None),
        };

        if stored.is_expired_at(Utc::now()) {
            self.storage.delete_refresh_token(&token_hash).await?;
            return Ok(None);
        }
        if claims.user_id() != Some(stored.user_id) {
            warn!("Refresh token subject does not match stored owner");
            return Ok(None);
        }

        let user = match self.storage.get_user_by_id(stored.user_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let access_token = self
            .tokens
            .generate_access_token(stored.user_id, &user.username)
            .map_err(|e| ApiError::internal(e.to_string()))?;

        Ok(Some(RefreshResponse {
            access_token,
            user_id: stored.user_id,
            username: user.username,
        }))
    }

    /// Revokes a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, request: RefreshRequest) -> ApiResult<()> {
        let token = match request.refresh_token.as_deref() {
            Some(t) if !t.trim().is_empty() => t.trim(),
            _ => return Err(ApiError::bad_request("Refresh token is required")),
        };
        self.storage
            .delete_refresh_token(&hash_refresh_token(token))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anilog_core::InMemoryStorage;
    use chrono::Duration;

    const SECRET: &str = "unit-test-secret-0123456789abcdef!!";

    fn use_case(storage: Arc<InMemoryStorage>) -> AuthUseCase {
        AuthUseCase::new(
            storage,
            PasswordHasher::new(4),
            TokenService::new(SECRET, Duration::minutes(15), Duration::days(7)),
        )
    }

    fn registration(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email_address: Some(email.to_string()),
            username: Some(username.to_string()),
            password: Some("Passw0rd!".to_string()),
            age: Some(21),
        }
    }

    fn login(identifier: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email_or_username: Some(identifier.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_validates_and_lowercases_email() {
        let storage = Arc::new(InMemoryStorage::new());
        let auth = use_case(storage.clone());

        let err = auth
            .register(RegisterRequest {
                username: Some("luffy".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email address is required");

        let user = auth.register(registration("Luffy@Sea.com", "luffy")).await.unwrap();
        assert_eq!(user.email_address, "luffy@sea.com");
        assert_ne!(user.password_hash, "Passw0rd!");

        let dup = auth.register(registration("other@sea.com", "LUFFY")).await.unwrap_err();
        assert!(matches!(dup, ApiError::Conflict(ref m) if m == "Username already exists"));

        let dup = auth.register(registration("LUFFY@sea.com", "zoro")).await.unwrap_err();
        assert!(matches!(dup, ApiError::Conflict(ref m) if m == "Email address already exists"));

        let mut negative = registration("nami@sea.com", "nami");
        negative.age = Some(-1);
        let err = auth.register(negative).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Age cannot be negative"));
        assert!(storage.get_user_by_username("nami").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_availability_checks() {
        let storage = Arc::new(InMemoryStorage::new());
        let auth = use_case(storage);
        auth.register(registration("nami@sea.com", "nami")).await.unwrap();

        assert!(!auth.username_available(Some("Nami")).await.unwrap());
        assert!(auth.username_available(Some("robin")).await.unwrap());
        assert!(!auth.email_available(Some("NAMI@sea.com")).await.unwrap());
        assert!(matches!(
            auth.email_available(Some("  ")).await.unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_login_by_username_or_email_rotates_refresh_tokens() {
        let storage = Arc::new(InMemoryStorage::new());
        let auth = use_case(storage.clone());
        auth.register(registration("sanji@sea.com", "sanji")).await.unwrap();

        let first = auth.login(login("sanji", "Passw0rd!")).await.unwrap();
        let second = auth.login(login("SANJI@sea.com", "Passw0rd!")).await.unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(second.username, "sanji");

        // The first refresh token was revoked by the second login.
        let old = storage
            .get_refresh_token(&hash_refresh_token(&first.refresh_token))
            .await
            .unwrap();
        assert!(old.is_none());

        let refreshed = auth
            .refresh(RefreshRequest {
                refresh_token: Some(second.refresh_token.clone()),
            })
            .await
            .unwrap();
        assert_eq!(refreshed.user_id, second.user_id);
        assert_eq!(refreshed.username, "sanji");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let storage = Arc::new(InMemoryStorage::new());
        let auth = use_case(storage);
        auth.register(registration("usopp@sea.com", "usopp")).await.unwrap();

        let err = auth.login(login("usopp", "wrong")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == INVALID_CREDENTIALS));

        let err = auth.login(login("nobody", "Passw0rd!")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err = auth.login(login("", "Passw0rd!")).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_tokens_and_revoked_tokens() {
        let storage = Arc::new(InMemoryStorage::new());
        let auth = use_case(storage);
        auth.register(registration("chopper@sea.com", "chopper")).await.unwrap();
        let session = auth.login(login("chopper", "Passw0rd!")).await.unwrap();

        let err = auth
            .refresh(RefreshRequest {
                refresh_token: Some(session.access_token.clone()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == INVALID_REFRESH));

        auth.logout(RefreshRequest {
            refresh_token: Some(session.refresh_token.clone()),
        })
        .await
        .unwrap();

        let err = auth
            .refresh(RefreshRequest {
                refresh_token: Some(session.refresh_token),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err = auth.refresh(RefreshRequest::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_expired_stored_refresh_token_is_deleted() {
        let storage = Arc::new(InMemoryStorage::new());
        let auth = use_case(storage.clone());
        let user = auth.register(registration("brook@sea.com", "brook")).await.unwrap();
        let user_id = user.id.unwrap();

        // Signed token is still valid but the stored row has lapsed.
        let token = TokenService::new(SECRET, Duration::minutes(15), Duration::days(7))
            .generate_refresh_token(user_id)
            .unwrap();
        let now = Utc::now();
        let mut stored = RefreshToken {
            id: None,
            token_hash: hash_refresh_token(&token),
            user_id,
            expires_at: now - Duration::seconds(1),
            created_at: now - Duration::days(8),
        };
        storage.save_refresh_token(&mut stored).await.unwrap();

        let err = auth
            .refresh(RefreshRequest {
                refresh_token: Some(token.clone()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert!(storage
            .get_refresh_token(&hash_refresh_token(&token))
            .await
            .unwrap()
            .is_none());
    }
}
