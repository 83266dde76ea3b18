use crate::app::{parse_media_type, parse_watch_status};
use crate::error::{ApiError, ApiResult};
use anilog_core::{Storage, WatchStatus, WatchedFilter, WatchedItem};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

const INVALID_TYPE: &str = "Type must be either 'ANIME' or 'MANGA'";
const NOT_FOUND: &str = "Watched item not found";
const DUPLICATE: &str = "Item already exists in watched list";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWatchedRequest {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub cover_image_url: Option<String>,
    pub anilist_id: Option<i64>,
    pub watched_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub episodes_watched: Option<i32>,
    pub total_episodes: Option<i32>,
    pub chapters_read: Option<i32>,
    pub total_chapters: Option<i32>,
    pub status: Option<String>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWatchedRequest {
    pub user_id: Option<i64>,
    pub status: Option<String>,
    pub episodes_watched: Option<i32>,
    pub total_episodes: Option<i32>,
    pub chapters_read: Option<i32>,
    pub total_chapters: Option<i32>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressRequest {
    pub progress: Option<i32>,
}

fn check_rating(rating: Option<f64>) -> ApiResult<()> {
    match rating {
        Some(r) if !(0.0..=10.0).contains(&r) => {
            Err(ApiError::bad_request("Rating must be between 0 and 10"))
        }
        _ => Ok(()),
    }
}

fn check_counts(counts: &[Option<i32>]) -> ApiResult<()> {
    if counts.iter().flatten().any(|c| *c < 0) {
        return Err(ApiError::bad_request("Episode and chapter counts cannot be negative"));
    }
    Ok(())
}

/// Tracked titles with progress, status and rating.
pub struct WatchedUseCase {
    storage: Arc<dyn Storage>,
}

impl WatchedUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Newest first. `media_type` and `status` are optional path filters.
    pub async fn list(
        &self,
        user_id: i64,
        media_type: Option<&str>,
        status: Option<&str>,
    ) -> ApiResult<Vec<WatchedItem>> {
        let filter = WatchedFilter {
            media_type: media_type
                .map(|t| parse_media_type(t, INVALID_TYPE))
                .transpose()?,
            status: status.map(parse_watch_status).transpose()?,
        };
        Ok(self.storage.get_watched_items(user_id, filter).await?)
    }

    pub async fn all(&self, user_id: i64) -> ApiResult<Vec<WatchedItem>> {
        self.list(user_id, None, None).await
    }

    pub async fn by_type(&self, user_id: i64, media_type: &str) -> ApiResult<Vec<WatchedItem>> {
        self.list(user_id, Some(media_type), None).await
    }

    pub async fn by_status(&self, user_id: i64, status: &str) -> ApiResult<Vec<WatchedItem>> {
        self.list(user_id, None, Some(status)).await
    }

    pub async fn by_type_and_status(
        &self,
        user_id: i64,
        media_type: &str,
        status: &str,
    ) -> ApiResult<Vec<WatchedItem>> {
        self.list(user_id, Some(media_type), Some(status)).await
    }

    pub async fn add(&self, request: AddWatchedRequest) -> ApiResult<WatchedItem> {
        let (user_id, raw_type, title) = match (
            request.user_id,
            request.media_type.as_deref(),
            request.title.as_deref(),
        ) {
            (Some(user_id), Some(t), Some(title))
                if !t.trim().is_empty() && !title.trim().is_empty() =>
            {
                (user_id, t, title.trim().to_string())
            }
            _ => return Err(ApiError::bad_request("User ID, type, and title are required")),
        };
        let media_type = parse_media_type(raw_type, INVALID_TYPE)?;
        let status = match request.status.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_watch_status(raw)?,
            _ => WatchStatus::initial_for(media_type),
        };
        check_rating(request.rating)?;
        check_counts(&[
            request.episodes_watched,
            request.total_episodes,
            request.chapters_read,
            request.total_chapters,
        ])?;

        let existing = match request.anilist_id {
            Some(anilist_id) => {
                self.storage
                    .find_watched_item_by_anilist_id(user_id, anilist_id)
                    .await?
            }
            None => self.storage.find_watched_item(user_id, &title, media_type).await?,
        };
        if existing.is_some() {
            return Err(ApiError::conflict(DUPLICATE));
        }

        let now = Utc::now();
        let mut item = WatchedItem {
            id: None,
            user_id,
            title,
            media_type,
            cover_image_url: request.cover_image_url,
            anilist_id: request.anilist_id,
            watched_date: request.watched_date.unwrap_or(now),
            completed_date: request.completed_date,
            episodes_watched: request.episodes_watched,
            total_episodes: request.total_episodes,
            chapters_read: request.chapters_read,
            total_chapters: request.total_chapters,
            status,
            rating: request.rating,
            notes: request.notes,
        };
        item.stamp_completion(now);

        self.storage.create_watched_item(&mut item).await.map_err(|e| {
            if e.is_duplicate() {
                ApiError::conflict(DUPLICATE)
            } else {
                e.into()
            }
        })?;

        info!("User {} started tracking '{}'", user_id, item.title);
        Ok(item)
    }

    pub async fn update(&self, item_id: i64, patch: UpdateWatchedRequest) -> ApiResult<WatchedItem> {
        let user_id = patch
            .user_id
            .ok_or_else(|| ApiError::bad_request("User ID is required"))?;
        let mut item = self
            .storage
            .get_watched_item_by_id(item_id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        if item.user_id != user_id {
            return Err(ApiError::forbidden("Unauthorized to update this item"));
        }
        check_rating(patch.rating)?;
        check_counts(&[
            patch.episodes_watched,
            patch.total_episodes,
            patch.chapters_read,
            patch.total_chapters,
        ])?;

        if let Some(raw) = patch.status.as_deref() {
            item.status = parse_watch_status(raw)?;
        }
        if patch.episodes_watched.is_some() {
            item.episodes_watched = patch.episodes_watched;
        }
        if patch.total_episodes.is_some() {
            item.total_episodes = patch.total_episodes;
        }
        if patch.chapters_read.is_some() {
            item.chapters_read = patch.chapters_read;
        }
        if patch.total_chapters.is_some() {
            item.total_chapters = patch.total_chapters;
        }
        if patch.rating.is_some() {
            item.rating = patch.rating;
        }
        if patch.notes.is_some() {
            item.notes = patch.notes;
        }
        if patch.completed_date.is_some() {
            item.completed_date = patch.completed_date;
        }
        item.stamp_completion(Utc::now());

        self.storage.update_watched_item(&item).await?;
        Ok(item)
    }

    pub async fn update_progress(
        &self,
        user_id: i64,
        anilist_id: i64,
        progress: Option<i32>,
    ) -> ApiResult<WatchedItem> {
        let progress = progress.ok_or_else(|| {
            ApiError::bad_request("User ID, Anilist ID, and progress are required")
        })?;
        if progress < 0 {
            return Err(ApiError::bad_request("Progress cannot be negative"));
        }

        let mut item = self
            .storage
            .find_watched_item_by_anilist_id(user_id, anilist_id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        item.apply_progress(progress, Utc::now());
        self.storage.update_watched_item(&item).await?;

        if item.status == WatchStatus::Completed {
            info!("User {} completed '{}'", user_id, item.title);
        }
        Ok(item)
    }

    pub async fn remove(&self, user_id: i64, anilist_id: i64) -> ApiResult<()> {
        let item = self
            .storage
            .find_watched_item_by_anilist_id(user_id, anilist_id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        if let Some(id) = item.id {
            self.storage.delete_watched_item(id).await?;
        }
        Ok(())
    }

    pub async fn remove_by_id(&self, user_id: i64, item_id: i64) -> ApiResult<()> {
        let item = self
            .storage
            .get_watched_item_by_id(item_id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        if item.user_id != user_id {
            return Err(ApiError::forbidden("Unauthorized to delete this item"));
        }

        self.storage.delete_watched_item(item_id).await?;
        Ok(())
    }
}
