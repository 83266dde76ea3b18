use super::traits::Storage;
use crate::common::error::{Result, StoreError};
use crate::domain::*;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    follows: BTreeMap<i64, Follow>,
    list_items: BTreeMap<i64, ListItem>,
    watched_items: BTreeMap<i64, WatchedItem>,
    refresh_tokens: BTreeMap<i64, RefreshToken>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory storage implementation for development/testing.
///
/// Enforces the same uniqueness rules as the database schema.
#[derive(Default)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn require_id(id: Option<i64>, what: &str) -> Result<i64> {
    id.ok_or_else(|| StoreError::InvalidRecord(format!("Cannot update {} without ID", what)))
}

fn username_taken(tables: &Tables, username: &str, except: Option<i64>) -> bool {
    tables
        .users
        .values()
        .any(|u| u.id != except && u.username.eq_ignore_ascii_case(username))
}

fn email_taken(tables: &Tables, email: &str, except: Option<i64>) -> bool {
    tables
        .users
        .values()
        .any(|u| u.id != except && u.email_address.eq_ignore_ascii_case(email))
}

fn watched_conflict(tables: &Tables, item: &WatchedItem) -> bool {
    tables.watched_items.values().any(|w| {
        w.id != item.id
            && w.user_id == item.user_id
            && match (w.anilist_id, item.anilist_id) {
                (Some(a), Some(b)) => a == b,
                (None, None) => w.media_type == item.media_type && w.title == item.title,
                _ => false,
            }
    })
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user(&self, user: &mut User) -> Result<()> {
        let mut tables = self.tables.write().await;
        if username_taken(&tables, &user.username, None) {
            return Err(StoreError::duplicate("users.username"));
        }
        if email_taken(&tables, &user.email_address, None) {
            return Err(StoreError::duplicate("users.email_address"));
        }

        let id = tables.next_id();
        user.id = Some(id);
        tables.users.insert(id, user.clone());

        debug!("Created user: {} with id {}", user.username, id);
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let id = require_id(user.id, "user")?;
        let mut tables = self.tables.write().await;
        if username_taken(&tables, &user.username, Some(id)) {
            return Err(StoreError::duplicate("users.username"));
        }
        if email_taken(&tables, &user.email_address, Some(id)) {
            return Err(StoreError::duplicate("users.email_address"));
        }
        tables.users.insert(id, user.clone());
        Ok(())
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email_address.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn search_users_by_username(&self, fragment: &str) -> Result<Vec<User>> {
        let needle = fragment.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.username.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn get_follow(&self, follower_id: i64, followee_id: i64) -> Result<Option<Follow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .find(|f| f.follower_id == follower_id && f.followee_id == followee_id)
            .cloned())
    }

    async fn save_follow(&self, follow: &mut Follow) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .follows
            .values()
            .find(|f| f.follower_id == follow.follower_id && f.followee_id == follow.followee_id)
            .and_then(|f| f.id);

        let id = match existing {
            Some(id) => id,
            None => tables.next_id(),
        };
        follow.id = Some(id);
        tables.follows.insert(id, follow.clone());

        debug!(
            "Saved follow {} -> {} as {}",
            follow.follower_id,
            follow.followee_id,
            follow.status.as_str()
        );
        Ok(())
    }

    async fn delete_follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.follower_id == follower_id && f.followee_id == followee_id));
        Ok(tables.follows.len() != before)
    }

    async fn get_follows_by_follower(&self, follower_id: i64) -> Result<Vec<Follow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|f| f.follower_id == follower_id)
            .cloned()
            .collect())
    }

    async fn get_follows_by_followee(&self, followee_id: i64) -> Result<Vec<Follow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|f| f.followee_id == followee_id)
            .cloned()
            .collect())
    }

    async fn create_list_item(&self, item: &mut ListItem) -> Result<()> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.list_items.values().any(|i| {
            i.user_id == item.user_id && i.media_type == item.media_type && i.title == item.title
        });
        if duplicate {
            return Err(StoreError::duplicate("user_list_items.user_id, title, type"));
        }

        let id = tables.next_id();
        item.id = Some(id);
        tables.list_items.insert(id, item.clone());
        Ok(())
    }

    async fn get_list_items(&self, user_id: i64, media_type: MediaType) -> Result<Vec<ListItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .list_items
            .values()
            .filter(|i| i.user_id == user_id && i.media_type == media_type)
            .cloned()
            .collect())
    }

    async fn find_list_item(
        &self,
        user_id: i64,
        title: &str,
        media_type: MediaType,
    ) -> Result<Option<ListItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .list_items
            .values()
            .find(|i| i.user_id == user_id && i.media_type == media_type && i.title == title)
            .cloned())
    }

    async fn find_list_item_by_anilist_id(
        &self,
        user_id: i64,
        anilist_id: i64,
    ) -> Result<Option<ListItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .list_items
            .values()
            .find(|i| i.user_id == user_id && i.anilist_id == Some(anilist_id))
            .cloned())
    }

    async fn get_list_item_by_id(&self, id: i64) -> Result<Option<ListItem>> {
        Ok(self.tables.read().await.list_items.get(&id).cloned())
    }

    async fn delete_list_item(&self, id: i64) -> Result<()> {
        self.tables.write().await.list_items.remove(&id);
        Ok(())
    }

    async fn create_watched_item(&self, item: &mut WatchedItem) -> Result<()> {
        let mut tables = self.tables.write().await;
        if watched_conflict(&tables, item) {
            return Err(StoreError::duplicate("watched_items"));
        }

        let id = tables.next_id();
        item.id = Some(id);
        tables.watched_items.insert(id, item.clone());

        debug!("Created watched item: {} with id {}", item.title, id);
        Ok(())
    }

    async fn update_watched_item(&self, item: &WatchedItem) -> Result<()> {
        let id = require_id(item.id, "watched item")?;
        let mut tables = self.tables.write().await;
        if watched_conflict(&tables, item) {
            return Err(StoreError::duplicate("watched_items"));
        }
        tables.watched_items.insert(id, item.clone());
        Ok(())
    }

    async fn get_watched_item_by_id(&self, id: i64) -> Result<Option<WatchedItem>> {
        Ok(self.tables.read().await.watched_items.get(&id).cloned())
    }

    async fn find_watched_item_by_anilist_id(
        &self,
        user_id: i64,
        anilist_id: i64,
    ) -> Result<Option<WatchedItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .watched_items
            .values()
            .find(|w| w.user_id == user_id && w.anilist_id == Some(anilist_id))
            .cloned())
    }

    async fn find_watched_item(
        &self,
        user_id: i64,
        title: &str,
        media_type: MediaType,
    ) -> Result<Option<WatchedItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .watched_items
            .values()
            .find(|w| w.user_id == user_id && w.media_type == media_type && w.title == title)
            .cloned())
    }

    async fn get_watched_items(
        &self,
        user_id: i64,
        filter: WatchedFilter,
    ) -> Result<Vec<WatchedItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<WatchedItem> = tables
            .watched_items
            .values()
            .filter(|w| w.user_id == user_id && filter.matches(w))
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            b.watched_date
                .cmp(&a.watched_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(items)
    }

    async fn delete_watched_item(&self, id: i64) -> Result<()> {
        self.tables.write().await.watched_items.remove(&id);
        Ok(())
    }

    async fn save_refresh_token(&self, token: &mut RefreshToken) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .refresh_tokens
            .values()
            .any(|t| t.token_hash == token.token_hash)
        {
            return Err(StoreError::duplicate("refresh_tokens.token_hash"));
        }

        let id = tables.next_id();
        token.id = Some(id);
        tables.refresh_tokens.insert(id, token.clone());
        Ok(())
    }

    async fn get_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .refresh_tokens
            .retain(|_, t| t.token_hash != token_hash);
        Ok(())
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: i64) -> Result<()> {
        self.tables
            .write()
            .await
            .refresh_tokens
            .retain(|_, t| t.user_id != user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn watched(user_id: i64, title: &str, anilist_id: Option<i64>) -> WatchedItem {
        WatchedItem {
            id: None,
            user_id,
            title: title.to_string(),
            media_type: MediaType::Anime,
            cover_image_url: None,
            anilist_id,
            watched_date: Utc::now(),
            completed_date: None,
            episodes_watched: None,
            total_episodes: None,
            chapters_read: None,
            total_chapters: None,
            status: WatchStatus::Watching,
            rating: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_assigns_id_and_enforces_uniqueness() {
        let storage = InMemoryStorage::new();
        let mut user = User::new("Spike", "spike@bebop.io", "hash".to_string());
        storage.create_user(&mut user).await.unwrap();
        assert!(user.id.is_some());

        let mut same_name = User::new("SPIKE", "other@bebop.io", "hash".to_string());
        let err = storage.create_user(&mut same_name).await.unwrap_err();
        assert!(err.is_duplicate());

        let mut same_email = User::new("Jet", "Spike@Bebop.io", "hash".to_string());
        assert!(storage.create_user(&mut same_email).await.unwrap_err().is_duplicate());
    }

    #[tokio::test]
    async fn test_username_lookup_and_search_are_case_insensitive() {
        let storage = InMemoryStorage::new();
        for name in ["Faye", "Fayette", "Ed"] {
            let mut user = User::new(name, &format!("{}@bebop.io", name), "h".to_string());
            storage.create_user(&mut user).await.unwrap();
        }

        let found = storage.get_user_by_username("faye").await.unwrap().unwrap();
        assert_eq!(found.username, "Faye");

        let matches = storage.search_users_by_username("FAY").await.unwrap();
        assert_eq!(matches.len(), 2);

        let by_email = storage.get_user_by_email("ED@BEBOP.IO").await.unwrap();
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn test_save_follow_upserts_on_pair() {
        let storage = InMemoryStorage::new();
        let mut follow = Follow::new(1, 2, FollowStatus::Requested);
        storage.save_follow(&mut follow).await.unwrap();
        let first_id = follow.id;

        let mut upgraded = Follow::new(1, 2, FollowStatus::Following);
        storage.save_follow(&mut upgraded).await.unwrap();
        assert_eq!(upgraded.id, first_id);

        let stored = storage.get_follow(1, 2).await.unwrap().unwrap();
        assert_eq!(stored.status, FollowStatus::Following);
        assert_eq!(storage.get_follows_by_follower(1).await.unwrap().len(), 1);

        assert!(storage.delete_follow(1, 2).await.unwrap());
        assert!(!storage.delete_follow(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_watched_items_unique_by_anilist_id_and_sorted_newest_first() {
        let storage = InMemoryStorage::new();
        let mut older = watched(1, "Trigun", Some(6));
        older.watched_date = Utc::now() - Duration::days(3);
        storage.create_watched_item(&mut older).await.unwrap();

        let mut newer = watched(1, "Cowboy Bebop", Some(1));
        storage.create_watched_item(&mut newer).await.unwrap();

        let mut dup = watched(1, "Trigun (renamed)", Some(6));
        assert!(storage.create_watched_item(&mut dup).await.unwrap_err().is_duplicate());

        let mut other_user = watched(2, "Trigun", Some(6));
        storage.create_watched_item(&mut other_user).await.unwrap();

        let items = storage
            .get_watched_items(1, WatchedFilter::default())
            .await
            .unwrap();
        let titles: Vec<&str> = items.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Cowboy Bebop", "Trigun"]);

        let completed = storage
            .get_watched_items(
                1,
                WatchedFilter {
                    media_type: None,
                    status: Some(WatchStatus::Completed),
                },
            )
            .await
            .unwrap();
        assert!(completed.is_empty());
    }

    #[tokio::test]
    async fn test_watched_items_with_same_date_list_newest_id_first() {
        let storage = InMemoryStorage::new();
        let stamp = Utc::now() - Duration::hours(1);
        for (title, anilist_id) in [("Akira", 47), ("Paprika", 1943), ("Perfect Blue", 437)] {
            let mut item = watched(1, title, Some(anilist_id));
            item.watched_date = stamp;
            storage.create_watched_item(&mut item).await.unwrap();
        }

        let items = storage
            .get_watched_items(1, WatchedFilter::default())
            .await
            .unwrap();
        let titles: Vec<&str> = items.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Perfect Blue", "Paprika", "Akira"]);
    }

    #[tokio::test]
    async fn test_refresh_tokens_delete_for_user() {
        let storage = InMemoryStorage::new();
        let now = Utc::now();
        for (hash, user_id) in [("a", 1), ("b", 1), ("c", 2)] {
            let mut token = RefreshToken {
                id: None,
                token_hash: hash.to_string(),
                user_id,
                expires_at: now + Duration::days(7),
                created_at: now,
            };
            storage.save_refresh_token(&mut token).await.unwrap();
        }

        storage.delete_refresh_tokens_for_user(1).await.unwrap();
        assert!(storage.get_refresh_token("a").await.unwrap().is_none());
        assert!(storage.get_refresh_token("b").await.unwrap().is_none());
        assert!(storage.get_refresh_token("c").await.unwrap().is_some());
    }
}
