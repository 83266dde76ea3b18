use super::traits::Storage;
use crate::common::error::{Result, StoreError};
use crate::database::DatabaseManager;
use crate::domain::*;
use async_trait::async_trait;
use libsql::params::IntoParams;
use libsql::Row;
use std::sync::Arc;
use tracing::{debug, info};

mod rows;

use rows::*;

/// Database storage implementation using Turso/libSQL relational tables
pub struct DatabaseStorage {
    db: Arc<DatabaseManager>,
}

/// Maps a libSQL error, surfacing unique-constraint violations as duplicates.
fn store_error(action: &str, e: libsql::Error) -> StoreError {
    let message = format!("Failed to {action}: {e}");
    if message.contains("UNIQUE constraint failed") {
        StoreError::Duplicate { message }
    } else {
        StoreError::Database { message }
    }
}

fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl DatabaseStorage {
    /// Runs migrations on an open connection.
    pub async fn with_manager(db_manager: DatabaseManager) -> Result<Self> {
        db_manager.run_migrations().await?;
        info!("Database storage ready");

        Ok(Self {
            db: Arc::new(db_manager),
        })
    }

    async fn fetch_all<T>(
        &self,
        action: &str,
        sql: &str,
        params: impl IntoParams,
        map: fn(&Row) -> Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.db.get_connection().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| store_error(action, e))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| store_error(action, e))? {
            results.push(map(&row)?);
        }
        Ok(results)
    }

    async fn fetch_one<T>(
        &self,
        action: &str,
        sql: &str,
        params: impl IntoParams,
        map: fn(&Row) -> Result<T>,
    ) -> Result<Option<T>> {
        Ok(self
            .fetch_all(action, sql, params, map)
            .await?
            .into_iter()
            .next())
    }

    async fn execute(&self, action: &str, sql: &str, params: impl IntoParams) -> Result<u64> {
        let conn = self.db.get_connection().await?;
        conn.execute(sql, params)
            .await
            .map_err(|e| store_error(action, e))
    }

    /// Runs an INSERT and returns the new row id.
    async fn insert(&self, action: &str, sql: &str, params: impl IntoParams) -> Result<i64> {
        let conn = self.db.get_connection().await?;
        conn.execute(sql, params)
            .await
            .map_err(|e| store_error(action, e))?;
        Ok(conn.last_insert_rowid())
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn create_user(&self, user: &mut User) -> Result<()> {
        let genres = serde_json::to_string(&user.favorite_genres)?;
        let id = self
            .insert(
                "insert user",
                "INSERT INTO users (username, password_hash, age, bio, avatar_url, email_address,
                     favorite_anime, favorite_genres, favorite_manga, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                libsql::params![
                    user.username.as_str(),
                    user.password_hash.as_str(),
                    user.age.map(i64::from),
                    user.bio.as_deref(),
                    user.avatar_url.as_deref(),
                    user.email_address.as_str(),
                    user.favorite_anime.as_deref(),
                    genres,
                    user.favorite_manga.as_deref(),
                    to_timestamp(&user.created_at)
                ],
            )
            .await?;

        user.id = Some(id);
        info!("Created user: {} with id {}", user.username, id);
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let id = user
            .id
            .ok_or_else(|| StoreError::InvalidRecord("Cannot update user without ID".to_string()))?;
        let genres = serde_json::to_string(&user.favorite_genres)?;

        self.execute(
            "update user",
            "UPDATE users SET username = ?1, password_hash = ?2, age = ?3, bio = ?4,
                 avatar_url = ?5, email_address = ?6, favorite_anime = ?7,
                 favorite_genres = ?8, favorite_manga = ?9
             WHERE id = ?10",
            libsql::params![
                user.username.as_str(),
                user.password_hash.as_str(),
                user.age.map(i64::from),
                user.bio.as_deref(),
                user.avatar_url.as_deref(),
                user.email_address.as_str(),
                user.favorite_anime.as_deref(),
                genres,
                user.favorite_manga.as_deref(),
                id
            ],
        )
        .await?;

        debug!("Updated user {}", id);
        Ok(())
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        self.fetch_one("query user", &sql, libsql::params![id], user_from_row)
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1 COLLATE NOCASE");
        self.fetch_one("query user", &sql, libsql::params![username], user_from_row)
            .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email_address = ?1 COLLATE NOCASE");
        self.fetch_one("query user", &sql, libsql::params![email], user_from_row)
            .await
    }

    async fn search_users_by_username(&self, fragment: &str) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username LIKE ?1 ESCAPE '\\' ORDER BY username"
        );
        self.fetch_all(
            "search users",
            &sql,
            libsql::params![like_pattern(fragment)],
            user_from_row,
        )
        .await
    }

    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        let mut users = Vec::new();
        for id in ids {
            if let Some(user) = self.get_user_by_id(*id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn get_follow(&self, follower_id: i64, followee_id: i64) -> Result<Option<Follow>> {
        let sql = format!(
            "SELECT {FOLLOW_COLUMNS} FROM follows WHERE follower_id = ?1 AND followee_id = ?2"
        );
        self.fetch_one(
            "query follow",
            &sql,
            libsql::params![follower_id, followee_id],
            follow_from_row,
        )
        .await
    }

    async fn save_follow(&self, follow: &mut Follow) -> Result<()> {
        // Keyed on the pair so concurrent follow/request calls never create two rows.
        let ids = self
            .fetch_all(
                "upsert follow",
                "INSERT INTO follows (follower_id, followee_id, status, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(follower_id, followee_id) DO UPDATE SET
                   status = excluded.status
                 RETURNING id",
                libsql::params![
                    follow.follower_id,
                    follow.followee_id,
                    follow.status.as_str(),
                    to_timestamp(&follow.created_at)
                ],
                |row| RowReader::new(row, "follows").i64(0),
            )
            .await?;

        follow.id = ids.into_iter().next();
        debug!(
            "Saved follow {} -> {} as {}",
            follow.follower_id,
            follow.followee_id,
            follow.status.as_str()
        );
        Ok(())
    }

    async fn delete_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let affected = self
            .execute(
                "delete follow",
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                libsql::params![follower_id, followee_id],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn get_follows_by_follower(&self, follower_id: i64) -> Result<Vec<Follow>> {
        let sql = format!("SELECT {FOLLOW_COLUMNS} FROM follows WHERE follower_id = ?1 ORDER BY id");
        self.fetch_all(
            "query follows",
            &sql,
            libsql::params![follower_id],
            follow_from_row,
        )
        .await
    }

    async fn get_follows_by_followee(&self, followee_id: i64) -> Result<Vec<Follow>> {
        let sql = format!("SELECT {FOLLOW_COLUMNS} FROM follows WHERE followee_id = ?1 ORDER BY id");
        self.fetch_all(
            "query follows",
            &sql,
            libsql::params![followee_id],
            follow_from_row,
        )
        .await
    }

    async fn create_list_item(&self, item: &mut ListItem) -> Result<()> {
        let id = self
            .insert(
                "insert list item",
                "INSERT INTO user_list_items (user_id, title, type, cover_image_url, anilist_id, added_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    item.user_id,
                    item.title.as_str(),
                    item.media_type.as_str(),
                    item.cover_image_url.as_deref(),
                    item.anilist_id,
                    to_timestamp(&item.added_date)
                ],
            )
            .await?;

        item.id = Some(id);
        debug!("Created list item: {} with id {}", item.title, id);
        Ok(())
    }

    async fn get_list_items(&self, user_id: i64, media_type: MediaType) -> Result<Vec<ListItem>> {
        let sql = format!(
            "SELECT {LIST_ITEM_COLUMNS} FROM user_list_items WHERE user_id = ?1 AND type = ?2 ORDER BY id"
        );
        self.fetch_all(
            "query list items",
            &sql,
            libsql::params![user_id, media_type.as_str()],
            list_item_from_row,
        )
        .await
    }

    async fn find_list_item(
        &self,
        user_id: i64,
        title: &str,
        media_type: MediaType,
    ) -> Result<Option<ListItem>> {
        let sql = format!(
            "SELECT {LIST_ITEM_COLUMNS} FROM user_list_items WHERE user_id = ?1 AND title = ?2 AND type = ?3"
        );
        self.fetch_one(
            "query list item",
            &sql,
            libsql::params![user_id, title, media_type.as_str()],
            list_item_from_row,
        )
        .await
    }

    async fn find_list_item_by_anilist_id(
        &self,
        user_id: i64,
        anilist_id: i64,
    ) -> Result<Option<ListItem>> {
        let sql = format!(
            "SELECT {LIST_ITEM_COLUMNS} FROM user_list_items WHERE user_id = ?1 AND anilist_id = ?2 ORDER BY id"
        );
        self.fetch_one(
            "query list item",
            &sql,
            libsql::params![user_id, anilist_id],
            list_item_from_row,
        )
        .await
    }

    async fn get_list_item_by_id(&self, id: i64) -> Result<Option<ListItem>> {
        let sql = format!("SELECT {LIST_ITEM_COLUMNS} FROM user_list_items WHERE id = ?1");
        self.fetch_one("query list item", &sql, libsql::params![id], list_item_from_row)
            .await
    }

    async fn delete_list_item(&self, id: i64) -> Result<()> {
        self.execute(
            "delete list item",
            "DELETE FROM user_list_items WHERE id = ?1",
            libsql::params![id],
        )
        .await?;
        Ok(())
    }

    async fn create_watched_item(&self, item: &mut WatchedItem) -> Result<()> {
        let id = self
            .insert(
                "insert watched item",
                "INSERT INTO watched_items (user_id, title, type, cover_image_url, anilist_id,
                     watched_date, completed_date, episodes_watched, total_episodes,
                     chapters_read, total_chapters, status, rating, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                libsql::params![
                    item.user_id,
                    item.title.as_str(),
                    item.media_type.as_str(),
                    item.cover_image_url.as_deref(),
                    item.anilist_id,
                    to_timestamp(&item.watched_date),
                    item.completed_date.as_ref().map(to_timestamp),
                    item.episodes_watched.map(i64::from),
                    item.total_episodes.map(i64::from),
                    item.chapters_read.map(i64::from),
                    item.total_chapters.map(i64::from),
                    item.status.as_str(),
                    item.rating,
                    item.notes.as_deref()
                ],
            )
            .await?;

        item.id = Some(id);
        info!("Created watched item: {} with id {}", item.title, id);
        Ok(())
    }

    async fn update_watched_item(&self, item: &WatchedItem) -> Result<()> {
        let id = item.id.ok_or_else(|| {
            StoreError::InvalidRecord("Cannot update watched item without ID".to_string())
        })?;

        self.execute(
            "update watched item",
            "UPDATE watched_items SET title = ?1, type = ?2, cover_image_url = ?3,
                 anilist_id = ?4, watched_date = ?5, completed_date = ?6,
                 episodes_watched = ?7, total_episodes = ?8, chapters_read = ?9,
                 total_chapters = ?10, status = ?11, rating = ?12, notes = ?13
             WHERE id = ?14",
            libsql::params![
                item.title.as_str(),
                item.media_type.as_str(),
                item.cover_image_url.as_deref(),
                item.anilist_id,
                to_timestamp(&item.watched_date),
                item.completed_date.as_ref().map(to_timestamp),
                item.episodes_watched.map(i64::from),
                item.total_episodes.map(i64::from),
                item.chapters_read.map(i64::from),
                item.total_chapters.map(i64::from),
                item.status.as_str(),
                item.rating,
                item.notes.as_deref(),
                id
            ],
        )
        .await?;

        debug!("Updated watched item {}", id);
        Ok(())
    }

    async fn get_watched_item_by_id(&self, id: i64) -> Result<Option<WatchedItem>> {
        let sql = format!("SELECT {WATCHED_COLUMNS} FROM watched_items WHERE id = ?1");
        self.fetch_one(
            "query watched item",
            &sql,
            libsql::params![id],
            watched_item_from_row,
        )
        .await
    }

    async fn find_watched_item_by_anilist_id(
        &self,
        user_id: i64,
        anilist_id: i64,
    ) -> Result<Option<WatchedItem>> {
        let sql = format!(
            "SELECT {WATCHED_COLUMNS} FROM watched_items WHERE user_id = ?1 AND anilist_id = ?2"
        );
        self.fetch_one(
            "query watched item",
            &sql,
            libsql::params![user_id, anilist_id],
            watched_item_from_row,
        )
        .await
    }

    async fn find_watched_item(
        &self,
        user_id: i64,
        title: &str,
        media_type: MediaType,
    ) -> Result<Option<WatchedItem>> {
        let sql = format!(
            "SELECT {WATCHED_COLUMNS} FROM watched_items WHERE user_id = ?1 AND title = ?2 AND type = ?3 ORDER BY id"
        );
        self.fetch_one(
            "query watched item",
            &sql,
            libsql::params![user_id, title, media_type.as_str()],
            watched_item_from_row,
        )
        .await
    }

    async fn get_watched_items(
        &self,
        user_id: i64,
        filter: WatchedFilter,
    ) -> Result<Vec<WatchedItem>> {
        let sql = format!(
            "SELECT {WATCHED_COLUMNS} FROM watched_items
             WHERE user_id = ?1
               AND (?2 IS NULL OR type = ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY watched_date DESC, id DESC"
        );
        self.fetch_all(
            "query watched items",
            &sql,
            libsql::params![
                user_id,
                filter.media_type.map(|t| t.as_str()),
                filter.status.map(|s| s.as_str())
            ],
            watched_item_from_row,
        )
        .await
    }

    async fn delete_watched_item(&self, id: i64) -> Result<()> {
        self.execute(
            "delete watched item",
            "DELETE FROM watched_items WHERE id = ?1",
            libsql::params![id],
        )
        .await?;
        Ok(())
    }

    async fn save_refresh_token(&self, token: &mut RefreshToken) -> Result<()> {
        let id = self
            .insert(
                "insert refresh token",
                "INSERT INTO refresh_tokens (token_hash, user_id, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![
                    token.token_hash.as_str(),
                    token.user_id,
                    to_timestamp(&token.expires_at),
                    to_timestamp(&token.created_at)
                ],
            )
            .await?;

        token.id = Some(id);
        Ok(())
    }

    async fn get_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        let sql = format!("SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens WHERE token_hash = ?1");
        self.fetch_one(
            "query refresh token",
            &sql,
            libsql::params![token_hash],
            refresh_token_from_row,
        )
        .await
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<()> {
        self.execute(
            "delete refresh token",
            "DELETE FROM refresh_tokens WHERE token_hash = ?1",
            libsql::params![token_hash],
        )
        .await?;
        Ok(())
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: i64) -> Result<()> {
        let removed = self
            .execute(
                "delete refresh tokens",
                "DELETE FROM refresh_tokens WHERE user_id = ?1",
                libsql::params![user_id],
            )
            .await?;
        debug!("Removed {} refresh tokens for user {}", removed, user_id);
        Ok(())
    }
}
