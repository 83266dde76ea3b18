use crate::common::error::Result;
use crate::domain::*;
use async_trait::async_trait;

/// Storage trait for persisting AniLog records (users, follows, list items,
/// watched items and refresh tokens).
///
/// `create_*` methods assign the generated id back onto the record.
/// Unique-constraint violations surface as `StoreError::Duplicate`.
#[async_trait]
pub trait Storage: Send + Sync {
    // User operations
    async fn create_user(&self, user: &mut User) -> Result<()>;
    async fn update_user(&self, user: &User) -> Result<()>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn search_users_by_username(&self, fragment: &str) -> Result<Vec<User>>;
    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>>;

    // Follow operations
    async fn get_follow(&self, follower_id: i64, followee_id: i64) -> Result<Option<Follow>>;
    async fn save_follow(&self, follow: &mut Follow) -> Result<()>;
    async fn delete_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool>;
    async fn get_follows_by_follower(&self, follower_id: i64) -> Result<Vec<Follow>>;
    async fn get_follows_by_followee(&self, followee_id: i64) -> Result<Vec<Follow>>;

    // List item operations
    async fn create_list_item(&self, item: &mut ListItem) -> Result<()>;
    async fn get_list_items(&self, user_id: i64, media_type: MediaType) -> Result<Vec<ListItem>>;
    async fn find_list_item(
        &self,
        user_id: i64,
        title: &str,
        media_type: MediaType,
    ) -> Result<Option<ListItem>>;
    async fn find_list_item_by_anilist_id(
        &self,
        user_id: i64,
        anilist_id: i64,
    ) -> Result<Option<ListItem>>;
    async fn get_list_item_by_id(&self, id: i64) -> Result<Option<ListItem>>;
    async fn delete_list_item(&self, id: i64) -> Result<()>;

    // Watched item operations
    async fn create_watched_item(&self, item: &mut WatchedItem) -> Result<()>;
    async fn update_watched_item(&self, item: &WatchedItem) -> Result<()>;
    async fn get_watched_item_by_id(&self, id: i64) -> Result<Option<WatchedItem>>;
    async fn find_watched_item_by_anilist_id(
        &self,
        user_id: i64,
        anilist_id: i64,
    ) -> Result<Option<WatchedItem>>;
    async fn find_watched_item(
        &self,
        user_id: i64,
        title: &str,
        media_type: MediaType,
    ) -> Result<Option<WatchedItem>>;
    /// Newest `watched_date` first.
    async fn get_watched_items(
        &self,
        user_id: i64,
        filter: WatchedFilter,
    ) -> Result<Vec<WatchedItem>>;
    async fn delete_watched_item(&self, id: i64) -> Result<()>;

    // Refresh token operations
    async fn save_refresh_token(&self, token: &mut RefreshToken) -> Result<()>;
    async fn get_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>>;
    async fn delete_refresh_token(&self, token_hash: &str) -> Result<()>;
    async fn delete_refresh_tokens_for_user(&self, user_id: i64) -> Result<()>;
}
