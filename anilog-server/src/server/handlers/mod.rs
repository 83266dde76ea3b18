pub mod auth;
pub mod follow;
pub mod list;
pub mod profile;
pub mod search;
pub mod watched;

use axum::Json;
use serde_json::{json, Value};

/// `{"message": ...}` body for simple successes.
pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}
