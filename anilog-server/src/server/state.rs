use crate::app::ports::MediaCatalogPort;
use crate::app::{
    AuthUseCase, FollowUseCase, ListUseCase, ProfileUseCase, SearchUseCase, WatchedUseCase,
};
use crate::auth::{PasswordHasher, TokenService};
use crate::config::Config;
use anilog_core::Storage;
use std::sync::Arc;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthUseCase>,
    pub profiles: Arc<ProfileUseCase>,
    pub follows: Arc<FollowUseCase>,
    pub lists: Arc<ListUseCase>,
    pub watched: Arc<WatchedUseCase>,
    pub search: Arc<SearchUseCase>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        catalog: Arc<dyn MediaCatalogPort>,
        config: &Config,
    ) -> Self {
        let tokens = TokenService::new(
            &config.auth.jwt_secret,
            chrono::Duration::minutes(config.auth.access_token_minutes),
            chrono::Duration::days(config.auth.refresh_token_days),
        );
        let hasher = PasswordHasher::new(config.auth.bcrypt_cost);

        Self {
            auth: Arc::new(AuthUseCase::new(storage.clone(), hasher, tokens.clone())),
            profiles: Arc::new(ProfileUseCase::new(storage.clone())),
            follows: Arc::new(FollowUseCase::new(storage.clone())),
            lists: Arc::new(ListUseCase::new(storage.clone())),
            watched: Arc::new(WatchedUseCase::new(storage)),
            search: Arc::new(SearchUseCase::new(catalog, config.anilist.per_page)),
            tokens,
        }
    }
}
