use super::message;
use crate::app::list_use_case::{AddListItemRequest, RemoveListItemRequest};
use crate::error::ApiResult;
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::AppState;
use anilog_core::ListItem;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

pub async fn get_list(
    State(state): State<AppState>,
    ApiPath((user_id, list_type)): ApiPath<(i64, String)>,
) -> ApiResult<Json<Vec<ListItem>>> {
    Ok(Json(state.lists.get_list(user_id, &list_type).await?))
}

pub async fn add(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddListItemRequest>,
) -> ApiResult<Json<ListItem>> {
    Ok(Json(state.lists.add(request).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RemoveListItemRequest>,
) -> ApiResult<Json<Value>> {
    state.lists.remove(request).await?;
    Ok(message("Item removed successfully"))
}

pub async fn remove_by_id(
    State(state): State<AppState>,
    ApiPath((user_id, item_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    state.lists.remove_by_id(user_id, item_id).await?;
    Ok(message("Item removed successfully"))
}
