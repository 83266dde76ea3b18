use crate::app::profile_use_case::ProfileUpdate;
use crate::error::ApiResult;
use crate::server::guard::authorize_owner;
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::AppState;
use anilog_core::{PrivateProfile, PublicProfile};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    headers: HeaderMap,
) -> ApiResult<Json<PrivateProfile>> {
    authorize_owner(&state.tokens, &headers, id)?;
    Ok(Json(state.profiles.get_profile(id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    headers: HeaderMap,
    ApiJson(patch): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<PrivateProfile>> {
    authorize_owner(&state.tokens, &headers, id)?;
    Ok(Json(state.profiles.update_profile(id, patch).await?))
}

pub async fn get_public_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PublicProfile>> {
    Ok(Json(state.profiles.get_public_profile(id).await?))
}

pub async fn search_by_username(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> ApiResult<Json<Vec<PublicProfile>>> {
    Ok(Json(state.profiles.search_profiles(&username).await?))
}

pub async fn get_public_profiles(
    State(state): State<AppState>,
    ApiJson(ids): ApiJson<Vec<i64>>,
) -> ApiResult<Json<Vec<PublicProfile>>> {
    Ok(Json(state.profiles.get_public_profiles(&ids).await?))
}
