use crate::app::search_use_case::SearchRequest;
use crate::error::ApiResult;
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::AppState;
use anilog_core::MediaResult;
use axum::extract::State;
use axum::Json;

pub async fn search(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> Json<Vec<MediaResult>> {
    Json(state.search.search(&request).await)
}

pub async fn by_id(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Json<Vec<MediaResult>> {
    Json(state.search.by_id(id).await)
}

pub async fn trending(
    State(state): State<AppState>,
    ApiPath(media_type): ApiPath<String>,
) -> ApiResult<Json<Vec<MediaResult>>> {
    Ok(Json(state.search.trending(&media_type).await?))
}

pub async fn popular(
    State(state): State<AppState>,
    ApiPath(media_type): ApiPath<String>,
) -> ApiResult<Json<Vec<MediaResult>>> {
    Ok(Json(state.search.popular(&media_type).await?))
}

pub async fn new_releases(
    State(state): State<AppState>,
    ApiPath(media_type): ApiPath<String>,
) -> ApiResult<Json<Vec<MediaResult>>> {
    Ok(Json(state.search.new_releases(&media_type).await?))
}

pub async fn coming_soon(
    State(state): State<AppState>,
    ApiPath(media_type): ApiPath<String>,
) -> ApiResult<Json<Vec<MediaResult>>> {
    Ok(Json(state.search.coming_soon(&media_type).await?))
}
