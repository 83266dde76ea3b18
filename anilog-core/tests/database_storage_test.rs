#![cfg(feature = "db")]

use anilog_core::{
    DatabaseManager, DatabaseStorage, Follow, FollowStatus, ListItem, MediaType, RefreshToken,
    Storage, User, WatchStatus, WatchedFilter, WatchedItem,
};
use chrono::{Duration, Utc};
use tempfile::TempDir;

async fn storage() -> (TempDir, DatabaseStorage) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anilog-test.db");
    let manager = DatabaseManager::connect(path.to_str().unwrap(), None)
        .await
        .unwrap();
    let storage = DatabaseStorage::with_manager(manager).await.unwrap();
    (dir, storage)
}

async fn user(storage: &DatabaseStorage, name: &str) -> User {
    let mut user = User::new(name, &format!("{}@example.com", name.to_lowercase()), "hash".to_string());
    user.favorite_genres = vec!["Action".to_string(), "Drama".to_string()];
    storage.create_user(&mut user).await.unwrap();
    user
}

fn watched(user_id: i64, title: &str, anilist_id: Option<i64>, days_ago: i64) -> WatchedItem {
    WatchedItem {
        id: None,
        user_id,
        title: title.to_string(),
        media_type: MediaType::Anime,
        cover_image_url: Some("https://img.example/cover.jpg".to_string()),
        anilist_id,
        watched_date: Utc::now() - Duration::days(days_ago),
        completed_date: None,
        episodes_watched: Some(3),
        total_episodes: Some(12),
        chapters_read: None,
        total_chapters: None,
        status: WatchStatus::Watching,
        rating: Some(8.5),
        notes: None,
    }
}

#[tokio::test]
async fn test_user_round_trip_and_case_insensitive_lookup() {
    let (_dir, storage) = storage().await;
    let created = user(&storage, "Mikasa").await;
    let id = created.id.unwrap();

    let loaded = storage.get_user_by_username("mikasa").await.unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.favorite_genres, vec!["Action", "Drama"]);
    assert_eq!(loaded.password_hash, "hash");

    let by_email = storage.get_user_by_email("MIKASA@EXAMPLE.COM").await.unwrap();
    assert!(by_email.is_some());

    let mut dup = User::new("MIKASA", "other@example.com", "hash".to_string());
    let err = storage.create_user(&mut dup).await.unwrap_err();
    assert!(err.is_duplicate());
}

#[tokio::test]
async fn test_update_user_and_fuzzy_search() {
    let (_dir, storage) = storage().await;
    let mut eren = user(&storage, "Eren").await;
    user(&storage, "Erwin").await;
    user(&storage, "Levi").await;

    eren.bio = Some("Tatakae".to_string());
    eren.age = Some(19);
    storage.update_user(&eren).await.unwrap();

    let loaded = storage.get_user_by_id(eren.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.bio.as_deref(), Some("Tatakae"));
    assert_eq!(loaded.age, Some(19));

    let matches = storage.search_users_by_username("er").await.unwrap();
    assert_eq!(matches.len(), 2);

    let none = storage.search_users_by_username("%").await.unwrap();
    assert!(none.is_empty());

    let ids = vec![eren.id.unwrap(), 9999];
    assert_eq!(storage.get_users_by_ids(&ids).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_follow_upsert_keeps_single_row() {
    let (_dir, storage) = storage().await;
    let a = user(&storage, "Armin").await.id.unwrap();
    let b = user(&storage, "Annie").await.id.unwrap();

    let mut request = Follow::new(a, b, FollowStatus::Requested);
    storage.save_follow(&mut request).await.unwrap();
    let mut accepted = Follow::new(a, b, FollowStatus::Following);
    storage.save_follow(&mut accepted).await.unwrap();

    assert_eq!(request.id, accepted.id);
    let follows = storage.get_follows_by_followee(b).await.unwrap();
    assert_eq!(follows.len(), 1);
    assert_eq!(follows[0].status, FollowStatus::Following);

    assert!(storage.delete_follow(a, b).await.unwrap());
    assert!(storage.get_follow(a, b).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_items_unique_per_title_and_type() {
    let (_dir, storage) = storage().await;
    let uid = user(&storage, "Sasha").await.id.unwrap();

    let mut item = ListItem {
        id: None,
        user_id: uid,
        title: "Mushishi".to_string(),
        media_type: MediaType::Anime,
        cover_image_url: None,
        anilist_id: Some(457),
        added_date: Utc::now(),
    };
    storage.create_list_item(&mut item).await.unwrap();

    let mut dup = item.clone();
    dup.id = None;
    assert!(storage.create_list_item(&mut dup).await.unwrap_err().is_duplicate());

    let mut manga = item.clone();
    manga.id = None;
    manga.media_type = MediaType::Manga;
    storage.create_list_item(&mut manga).await.unwrap();

    assert_eq!(storage.get_list_items(uid, MediaType::Anime).await.unwrap().len(), 1);
    let found = storage.find_list_item_by_anilist_id(uid, 457).await.unwrap();
    assert!(found.is_some());

    storage.delete_list_item(item.id.unwrap()).await.unwrap();
    assert!(storage.get_list_item_by_id(item.id.unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_watched_items_filter_order_and_update() {
    let (_dir, storage) = storage().await;
    let uid = user(&storage, "Hange").await.id.unwrap();

    let mut old = watched(uid, "Planetes", Some(329), 10);
    storage.create_watched_item(&mut old).await.unwrap();
    let mut recent = watched(uid, "Vinland Saga", Some(101348), 1);
    storage.create_watched_item(&mut recent).await.unwrap();

    let mut dup = watched(uid, "Planetes again", Some(329), 0);
    assert!(storage.create_watched_item(&mut dup).await.unwrap_err().is_duplicate());

    let all = storage.get_watched_items(uid, WatchedFilter::default()).await.unwrap();
    let titles: Vec<&str> = all.iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["Vinland Saga", "Planetes"]);

    old.status = WatchStatus::Completed;
    old.completed_date = Some(Utc::now());
    storage.update_watched_item(&old).await.unwrap();

    let completed = storage
        .get_watched_items(
            uid,
            WatchedFilter {
                media_type: Some(MediaType::Anime),
                status: Some(WatchStatus::Completed),
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].title, "Planetes");
    assert!(completed[0].completed_date.is_some());
    assert_eq!(completed[0].rating, Some(8.5));

    let manga = storage
        .get_watched_items(
            uid,
            WatchedFilter {
                media_type: Some(MediaType::Manga),
                status: None,
            },
        )
        .await
        .unwrap();
    assert!(manga.is_empty());
}

#[tokio::test]
async fn test_refresh_token_lifecycle() {
    let (_dir, storage) = storage().await;
    let uid = user(&storage, "Reiner").await.id.unwrap();
    let now = Utc::now();

    let mut token = RefreshToken {
        id: None,
        token_hash: "deadbeef".to_string(),
        user_id: uid,
        expires_at: now + Duration::days(7),
        created_at: now,
    };
    storage.save_refresh_token(&mut token).await.unwrap();
    assert!(token.id.is_some());

    let loaded = storage.get_refresh_token("deadbeef").await.unwrap().unwrap();
    assert_eq!(loaded.user_id, uid);
    assert!(!loaded.is_expired_at(now));

    storage.delete_refresh_tokens_for_user(uid).await.unwrap();
    assert!(storage.get_refresh_token("deadbeef").await.unwrap().is_none());
}
