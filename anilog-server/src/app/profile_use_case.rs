use super::{user_conflict, validate_age};
use crate::error::{ApiError, ApiResult};
use anilog_core::{PrivateProfile, PublicProfile, Storage, User};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

const USER_NOT_FOUND: &str = "User not found";

/// Partial profile update; only provided fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email_address: Option<String>,
    pub age: Option<i32>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub favorite_anime: Option<String>,
    pub favorite_genres: Option<Vec<String>>,
    pub favorite_manga: Option<String>,
}

pub struct ProfileUseCase {
    storage: Arc<dyn Storage>,
}

impl ProfileUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn user(&self, id: i64) -> ApiResult<User> {
        self.storage
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))
    }

    pub async fn get_profile(&self, id: i64) -> ApiResult<PrivateProfile> {
        Ok(PrivateProfile::from(&self.user(id).await?))
    }

    pub async fn get_public_profile(&self, id: i64) -> ApiResult<PublicProfile> {
        Ok(PublicProfile::from(&self.user(id).await?))
    }

    pub async fn search_profiles(&self, fragment: &str) -> ApiResult<Vec<PublicProfile>> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(ApiError::bad_request("Username is required"));
        }

        let users = self.storage.search_users_by_username(fragment).await?;
        if users.is_empty() {
            return Err(ApiError::not_found(USER_NOT_FOUND));
        }
        Ok(users.iter().map(PublicProfile::from).collect())
    }

    /// Unknown ids are skipped.
    pub async fn get_public_profiles(&self, ids: &[i64]) -> ApiResult<Vec<PublicProfile>> {
        let users = self.storage.get_users_by_ids(ids).await?;
        Ok(users.iter().map(PublicProfile::from).collect())
    }

    pub async fn update_profile(&self, id: i64, patch: ProfileUpdate) -> ApiResult<PrivateProfile> {
        let mut user = self.user(id).await?;

        if let Some(username) = patch.username {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(ApiError::bad_request("Username cannot be blank"));
            }
            if !username.eq_ignore_ascii_case(&user.username) {
                if let Some(other) = self.storage.get_user_by_username(&username).await? {
                    if other.id != user.id {
                        return Err(ApiError::conflict("Username already exists"));
                    }
                }
            }
            user.username = username;
        }

        if let Some(email) = patch.email_address {
            let email = email.trim().to_lowercase();
            if email.is_empty() {
                return Err(ApiError::bad_request("Email address cannot be blank"));
            }
            if email != user.email_address {
                if let Some(other) = self.storage.get_user_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(ApiError::conflict("Email address already exists"));
                    }
                }
            }
            user.email_address = email;
        }

        if patch.age.is_some() {
            validate_age(patch.age)?;
            user.age = patch.age;
        }
        if patch.bio.is_some() {
            user.bio = patch.bio;
        }
        if patch.avatar_url.is_some() {
            user.avatar_url = patch.avatar_url;
        }
        if patch.favorite_anime.is_some() {
            user.favorite_anime = patch.favorite_anime;
        }
        if let Some(genres) = patch.favorite_genres {
            user.favorite_genres = genres;
        }
        if patch.favorite_manga.is_some() {
            user.favorite_manga = patch.favorite_manga;
        }

        self.storage.update_user(&user).await.map_err(user_conflict)?;
        info!("Updated profile for user {}", id);
        Ok(PrivateProfile::from(&user))
    }
}
