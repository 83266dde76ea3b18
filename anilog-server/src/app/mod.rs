pub mod auth_use_case;
pub mod follow_use_case;
pub mod list_use_case;
pub mod ports;
pub mod profile_use_case;
pub mod search_use_case;
pub mod watched_use_case;

pub use auth_use_case::AuthUseCase;
pub use follow_use_case::FollowUseCase;
pub use list_use_case::ListUseCase;
pub use profile_use_case::ProfileUseCase;
pub use search_use_case::SearchUseCase;
pub use watched_use_case::WatchedUseCase;

use crate::error::{ApiError, ApiResult};
use anilog_core::{MediaType, StoreError, WatchStatus};

/// True when an optional request field is missing or only whitespace.
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

pub(crate) fn parse_media_type(raw: &str, message: &str) -> ApiResult<MediaType> {
    raw.parse().map_err(|_| ApiError::bad_request(message))
}

pub(crate) fn parse_watch_status(raw: &str) -> ApiResult<WatchStatus> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid watch status: {}", raw)))
}

pub(crate) fn validate_age(age: Option<i32>) -> ApiResult<()> {
    match age {
        Some(age) if age < 0 => Err(ApiError::bad_request("Age cannot be negative")),
        _ => Ok(()),
    }
}

/// Maps a unique-index violation on `users` to the same conflict the
/// pre-insert lookups report.
pub(crate) fn user_conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate { ref message } if message.contains("email_address") => {
            ApiError::conflict("Email address already exists")
        }
        StoreError::Duplicate { .. } => ApiError::conflict("Username already exists"),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_conflict_names_the_taken_column() {
        let err = user_conflict(StoreError::duplicate(
            "Failed to update user: UNIQUE constraint failed: users.email_address",
        ));
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "Email address already exists"));

        let err = user_conflict(StoreError::duplicate("users.username"));
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "Username already exists"));

        let err = user_conflict(StoreError::database("disk I/O error"));
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_validate_age() {
        assert!(validate_age(None).is_ok());
        assert!(validate_age(Some(0)).is_ok());
        let err = validate_age(Some(-1)).unwrap_err();
        assert_eq!(err.to_string(), "Age cannot be negative");
    }
}
