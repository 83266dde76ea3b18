use super::message;
use crate::app::auth_use_case::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest};
use crate::error::ApiResult;
use crate::server::extract::{ApiJson, ApiQuery};
use crate::server::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailQuery {
    pub email_address: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    state.auth.register(request).await?;
    Ok((StatusCode::CREATED, message("User registered successfully")))
}

pub async fn check_username(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UsernameQuery>,
) -> ApiResult<Json<Value>> {
    let available = state.auth.username_available(query.username.as_deref()).await?;
    let text = if available {
        "Username available"
    } else {
        "Username already taken"
    };
    Ok(Json(json!({ "available": available, "message": text })))
}

pub async fn check_email(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmailQuery>,
) -> ApiResult<Json<Value>> {
    let available = state.auth.email_available(query.email_address.as_deref()).await?;
    let text = if available {
        "Email address available"
    } else {
        "Email address already taken"
    };
    Ok(Json(json!({ "available": available, "message": text })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    Ok(Json(state.auth.login(request).await?))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    Ok(Json(state.auth.refresh(request).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    state.auth.logout(request).await?;
    Ok(message("Logged out successfully"))
}
