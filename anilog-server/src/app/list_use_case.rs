use crate::app::{is_blank, parse_media_type};
use crate::error::{ApiError, ApiResult};
use anilog_core::{ListItem, MediaType, Storage};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

const INVALID_LIST_TYPE: &str = "List type must be either 'ANIME' or 'MANGA'";
const ITEM_NOT_FOUND: &str = "Item not found in the user's list";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddListItemRequest {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub cover_image_url: Option<String>,
    pub anilist_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveListItemRequest {
    pub user_id: Option<i64>,
    pub anilist_id: Option<i64>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

/// Per-user plan/favourite lists, one per media type.
pub struct ListUseCase {
    storage: Arc<dyn Storage>,
}

impl ListUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn get_list(&self, user_id: i64, list_type: &str) -> ApiResult<Vec<ListItem>> {
        let media_type = parse_media_type(list_type, INVALID_LIST_TYPE)?;
        Ok(self.storage.get_list_items(user_id, media_type).await?)
    }

    pub async fn add(&self, request: AddListItemRequest) -> ApiResult<ListItem> {
        let (user_id, raw_type) = match (request.user_id, request.media_type.as_deref()) {
            (Some(user_id), Some(t)) if !t.trim().is_empty() => (user_id, t),
            _ => return Err(ApiError::bad_request("User ID and list type are required")),
        };
        let media_type = parse_media_type(raw_type, INVALID_LIST_TYPE)?;
        let title = match request.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => return Err(ApiError::bad_request("Title is required")),
        };

        if self.storage.get_user_by_id(user_id).await?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }
        if self
            .storage
            .find_list_item(user_id, &title, media_type)
            .await?
            .is_some()
        {
            return Err(ApiError::conflict("Item already exists in the user's list"));
        }

        let mut item = ListItem {
            id: None,
            user_id,
            title,
            media_type,
            cover_image_url: request.cover_image_url,
            anilist_id: request.anilist_id,
            added_date: Utc::now(),
        };
        self.storage.create_list_item(&mut item).await.map_err(|e| {
            if e.is_duplicate() {
                ApiError::conflict("Item already exists in the user's list")
            } else {
                e.into()
            }
        })?;

        info!("Added '{}' to user {} {} list", item.title, user_id, media_type);
        Ok(item)
    }

    /// Removes by AniList id when given, otherwise by title and type.
    pub async fn remove(&self, request: RemoveListItemRequest) -> ApiResult<()> {
        let user_id = request
            .user_id
            .ok_or_else(|| ApiError::bad_request("User ID and Anilist ID are required"))?;

        let existing = if let Some(anilist_id) = request.anilist_id {
            self.storage
                .find_list_item_by_anilist_id(user_id, anilist_id)
                .await?
        } else if !is_blank(request.title.as_deref()) && !is_blank(request.media_type.as_deref()) {
            let media_type: MediaType = parse_media_type(
                request.media_type.as_deref().unwrap_or_default(),
                INVALID_LIST_TYPE,
            )?;
            let title = request.title.as_deref().unwrap_or_default().trim();
            self.storage.find_list_item(user_id, title, media_type).await?
        } else {
            return Err(ApiError::bad_request("User ID and Anilist ID are required"));
        };

        let item = existing.ok_or_else(|| ApiError::not_found(ITEM_NOT_FOUND))?;
        if let Some(id) = item.id {
            self.storage.delete_list_item(id).await?;
        }
        info!("Removed '{}' from user {} list", item.title, user_id);
        Ok(())
    }

    pub async fn remove_by_id(&self, user_id: i64, item_id: i64) -> ApiResult<()> {
        let item = self
            .storage
            .get_list_item_by_id(item_id)
            .await?
            .ok_or_else(|| ApiError::not_found(ITEM_NOT_FOUND))?;

        if item.user_id != user_id {
            return Err(ApiError::forbidden("Unauthorized to delete this item"));
        }

        self.storage.delete_list_item(item_id).await?;
        Ok(())
    }
}
