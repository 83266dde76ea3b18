use super::message;
use crate::error::ApiResult;
use crate::server::extract::ApiPath;
use crate::server::AppState;
use anilog_core::Follow;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

pub async fn follow(
    State(state): State<AppState>,
    ApiPath((user_id, target_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    state.follows.follow(user_id, target_id).await?;
    Ok(message("User followed successfully"))
}

pub async fn request(
    State(state): State<AppState>,
    ApiPath((user_id, target_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    state.follows.request(user_id, target_id).await?;
    Ok(message("Follow request sent successfully"))
}

pub async fn unfollow(
    State(state): State<AppState>,
    ApiPath((user_id, target_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    state.follows.unfollow(user_id, target_id).await?;
    Ok(message("User unfollowed successfully"))
}

pub async fn accept(
    State(state): State<AppState>,
    ApiPath((user_id, requester_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    state.follows.accept(user_id, requester_id).await?;
    Ok(message("Follow request accepted"))
}

pub async fn deny(
    State(state): State<AppState>,
    ApiPath((user_id, requester_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    state.follows.deny(user_id, requester_id).await?;
    Ok(message("Follow request denied"))
}

pub async fn statuses(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Follow>>> {
    Ok(Json(state.follows.statuses(user_id).await?))
}
