use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod media;

pub use media::{MediaResult, MediaTitle, NextAiringEpisode};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub age: Option<i32>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub email_address: String,
    pub favorite_anime: Option<String>,
    #[serde(default)]
    pub favorite_genres: Vec<String>,
    pub favorite_manga: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, email_address: &str, password_hash: String) -> Self {
        Self {
            id: None,
            username: username.to_string(),
            password_hash,
            age: None,
            bio: None,
            avatar_url: None,
            email_address: email_address.to_lowercase(),
            favorite_anime: None,
            favorite_genres: Vec::new(),
            favorite_manga: None,
            created_at: Utc::now(),
        }
    }
}

/// Profile fields that anyone may see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: i64,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub favorite_anime: Option<String>,
    pub favorite_genres: Vec<String>,
    pub favorite_manga: Option<String>,
}

/// Profile as seen by its owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrivateProfile {
    #[serde(flatten)]
    pub public: PublicProfile,
    pub email_address: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            username: user.username.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            favorite_anime: user.favorite_anime.clone(),
            favorite_genres: user.favorite_genres.clone(),
            favorite_manga: user.favorite_manga.clone(),
        }
    }
}

impl From<&User> for PrivateProfile {
    fn from(user: &User) -> Self {
        Self {
            public: PublicProfile::from(user),
            email_address: user.email_address.clone(),
            age: user.age,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowStatus {
    Requested,
    Following,
}

impl FollowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowStatus::Requested => "REQUESTED",
            FollowStatus::Following => "FOLLOWING",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub id: Option<i64>,
    pub follower_id: i64,
    pub followee_id: i64,
    pub status: FollowStatus,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    pub fn new(follower_id: i64, followee_id: i64, status: FollowStatus) -> Self {
        Self {
            id: None,
            follower_id,
            followee_id,
            status,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Anime,
    Manga,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Anime => "ANIME",
            MediaType::Manga => "MANGA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchStatus {
    Watching,
    Reading,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
    PlanToRead,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Watching => "WATCHING",
            WatchStatus::Reading => "READING",
            WatchStatus::Completed => "COMPLETED",
            WatchStatus::OnHold => "ON_HOLD",
            WatchStatus::Dropped => "DROPPED",
            WatchStatus::PlanToWatch => "PLAN_TO_WATCH",
            WatchStatus::PlanToRead => "PLAN_TO_READ",
        }
    }

    /// Status a freshly tracked title starts in.
    pub fn initial_for(media_type: MediaType) -> Self {
        match media_type {
            MediaType::Anime => WatchStatus::Watching,
            MediaType::Manga => WatchStatus::Reading,
        }
    }
}

/// Error returned when a path or body value names no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for FollowStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REQUESTED" => Ok(FollowStatus::Requested),
            "FOLLOWING" => Ok(FollowStatus::Following),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl FromStr for MediaType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ANIME" => Ok(MediaType::Anime),
            "MANGA" => Ok(MediaType::Manga),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl FromStr for WatchStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WATCHING" => Ok(WatchStatus::Watching),
            "READING" => Ok(WatchStatus::Reading),
            "COMPLETED" => Ok(WatchStatus::Completed),
            "ON_HOLD" => Ok(WatchStatus::OnHold),
            "DROPPED" => Ok(WatchStatus::Dropped),
            "PLAN_TO_WATCH" => Ok(WatchStatus::PlanToWatch),
            "PLAN_TO_READ" => Ok(WatchStatus::PlanToRead),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry on a user's anime or manga list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub cover_image_url: Option<String>,
    pub anilist_id: Option<i64>,
    pub added_date: DateTime<Utc>,
}

/// A tracked title with progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedItem {
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub cover_image_url: Option<String>,
    pub anilist_id: Option<i64>,
    pub watched_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub episodes_watched: Option<i32>,
    pub total_episodes: Option<i32>,
    pub chapters_read: Option<i32>,
    pub total_chapters: Option<i32>,
    pub status: WatchStatus,
    pub rating: Option<f64>,
    pub notes: Option<String>,
}

impl WatchedItem {
    /// Stamps `completed_date` when the item is completed but has none yet.
    pub fn stamp_completion(&mut self, now: DateTime<Utc>) {
        if self.status == WatchStatus::Completed && self.completed_date.is_none() {
            self.completed_date = Some(now);
        }
    }

    /// Records progress and marks the item completed once the known total is reached.
    pub fn apply_progress(&mut self, progress: i32, now: DateTime<Utc>) {
        let total = match self.media_type {
            MediaType::Anime => {
                self.episodes_watched = Some(progress);
                self.total_episodes
            }
            MediaType::Manga => {
                self.chapters_read = Some(progress);
                self.total_chapters
            }
        };

        if matches!(total, Some(total) if progress >= total) {
            self.status = WatchStatus::Completed;
            self.completed_date = Some(now);
        }
    }
}

/// Optional filters for watched item queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchedFilter {
    pub media_type: Option<MediaType>,
    pub status: Option<WatchStatus>,
}

impl WatchedFilter {
    pub fn matches(&self, item: &WatchedItem) -> bool {
        self.media_type.map_or(true, |t| item.media_type == t)
            && self.status.map_or(true, |s| item.status == s)
    }
}

/// Persisted refresh token; only the digest of the token is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub id: Option<i64>,
    pub token_hash: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
