use super::message;
use crate::app::watched_use_case::{AddWatchedRequest, ProgressRequest, UpdateWatchedRequest};
use crate::error::ApiResult;
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::AppState;
use anilog_core::WatchedItem;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

pub async fn all(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<WatchedItem>>> {
    Ok(Json(state.watched.all(user_id).await?))
}

pub async fn by_type(
    State(state): State<AppState>,
    ApiPath((user_id, media_type)): ApiPath<(i64, String)>,
) -> ApiResult<Json<Vec<WatchedItem>>> {
    Ok(Json(state.watched.by_type(user_id, &media_type).await?))
}

pub async fn by_status(
    State(state): State<AppState>,
    ApiPath((user_id, status)): ApiPath<(i64, String)>,
) -> ApiResult<Json<Vec<WatchedItem>>> {
    Ok(Json(state.watched.by_status(user_id, &status).await?))
}

pub async fn by_type_and_status(
    State(state): State<AppState>,
    ApiPath((user_id, media_type, status)): ApiPath<(i64, String, String)>,
) -> ApiResult<Json<Vec<WatchedItem>>> {
    Ok(Json(
        state
            .watched
            .by_type_and_status(user_id, &media_type, &status)
            .await?,
    ))
}

pub async fn add(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddWatchedRequest>,
) -> ApiResult<Json<WatchedItem>> {
    Ok(Json(state.watched.add(request).await?))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateWatchedRequest>,
) -> ApiResult<Json<WatchedItem>> {
    Ok(Json(state.watched.update(item_id, patch).await?))
}

pub async fn update_progress(
    State(state): State<AppState>,
    ApiPath((user_id, anilist_id)): ApiPath<(i64, i64)>,
    ApiJson(request): ApiJson<ProgressRequest>,
) -> ApiResult<Json<WatchedItem>> {
    Ok(Json(
        state
            .watched
            .update_progress(user_id, anilist_id, request.progress)
            .await?,
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    ApiPath((user_id, anilist_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    state.watched.remove(user_id, anilist_id).await?;
    Ok(message("Watched item removed successfully"))
}

pub async fn remove_by_id(
    State(state): State<AppState>,
    ApiPath((user_id, item_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    state.watched.remove_by_id(user_id, item_id).await?;
    Ok(message("Watched item removed successfully"))
}
