use anilog_core::MediaResult;
use async_trait::async_trait;
use serde_json::Value;

/// Remote media catalog (AniList). Errors are plain strings; callers decide
/// whether to surface or swallow them.
#[async_trait]
pub trait MediaCatalogPort: Send + Sync {
    /// Runs the paged media search with the given GraphQL variables.
    async fn search_media(&self, variables: Value) -> Result<Vec<MediaResult>, String>;

    async fn media_by_id(&self, id: i64) -> Result<Vec<MediaResult>, String>;
}
