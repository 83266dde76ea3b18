use crate::app::parse_media_type;
use crate::app::ports::MediaCatalogPort;
use crate::error::ApiResult;
use crate::observability::metrics;
use anilog_core::{MediaResult, MediaType};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const EXCLUDED_GENRES: [&str; 1] = ["Hentai"];
const INVALID_TYPE: &str = "Type must be either 'ANIME' or 'MANGA'";

/// Body of `POST /api/search`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub query: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub format: Vec<String>,
    pub status: Vec<String>,
    pub is_adult: bool,
    pub genres: Vec<String>,
    pub sort_by: Option<String>,
}

/// Canned discovery feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    Trending,
    Popular,
    NewReleases,
    ComingSoon,
}

impl Discovery {
    fn operation(&self) -> &'static str {
        match self {
            Discovery::Trending => "trending",
            Discovery::Popular => "popular",
            Discovery::NewReleases => "new",
            Discovery::ComingSoon => "comingsoon",
        }
    }

    fn sort(&self) -> &'static str {
        match self {
            Discovery::Trending => "TRENDING_DESC",
            Discovery::Popular | Discovery::ComingSoon => "POPULARITY_DESC",
            Discovery::NewReleases => "START_DATE_DESC",
        }
    }

    fn status(&self) -> Option<&'static str> {
        match self {
            Discovery::NewReleases => Some("RELEASING"),
            Discovery::ComingSoon => Some("NOT_YET_RELEASED"),
            _ => None,
        }
    }
}

/// Builds AniList variables from a search request.
pub fn search_variables(request: &SearchRequest, per_page: u32) -> Value {
    let mut vars = Map::new();
    vars.insert("page".into(), json!(1));
    vars.insert("perPage".into(), json!(per_page));

    if let Some(query) = request.query.as_deref().filter(|q| !q.is_empty()) {
        vars.insert("search".into(), json!(query));
    }
    if let Some(media_type) = request
        .media_type
        .as_deref()
        .filter(|t| !t.is_empty() && *t != "Any")
    {
        vars.insert("type".into(), json!(media_type));
    }
    if !request.format.is_empty() {
        vars.insert("format".into(), json!(request.format));
    }
    if !request.status.is_empty() {
        vars.insert("statusIn".into(), json!(request.status));
    }
    if !request.is_adult {
        vars.insert("isAdult".into(), json!(false));
    }
    if !request.genres.is_empty() {
        vars.insert("genres".into(), json!(request.genres));
    }
    if let Some(sort) = request.sort_by.as_deref().filter(|s| !s.is_empty()) {
        vars.insert("sortBy".into(), json!([sort]));
    }
    vars.insert("genresNotIn".into(), json!(EXCLUDED_GENRES));

    Value::Object(vars)
}

fn discovery_variables(feed: Discovery, media_type: MediaType, per_page: u32) -> Value {
    let mut vars = json!({
        "page": 1,
        "perPage": per_page,
        "type": media_type.as_str(),
        "isAdult": false,
        "sortBy": [feed.sort()],
        "genresNotIn": EXCLUDED_GENRES,
    });
    if let Some(status) = feed.status() {
        vars["statusIn"] = json!([status]);
    }
    vars
}

/// AniList-backed search. Upstream failures degrade to an empty result list.
pub struct SearchUseCase {
    catalog: Arc<dyn MediaCatalogPort>,
    per_page: u32,
}

impl SearchUseCase {
    pub fn new(catalog: Arc<dyn MediaCatalogPort>, per_page: u32) -> Self {
        Self { catalog, per_page }
    }

    pub async fn search(&self, request: &SearchRequest) -> Vec<MediaResult> {
        let variables = search_variables(request, self.per_page);
        debug!("AniList search variables: {}", variables);
        self.run("search", self.catalog.search_media(variables)).await
    }

    pub async fn by_id(&self, id: i64) -> Vec<MediaResult> {
        self.run("by_id", self.catalog.media_by_id(id)).await
    }

    pub async fn discover(&self, feed: Discovery, media_type: &str) -> ApiResult<Vec<MediaResult>> {
        let media_type = parse_media_type(media_type, INVALID_TYPE)?;
        let variables = discovery_variables(feed, media_type, self.per_page);
        Ok(self
            .run(feed.operation(), self.catalog.search_media(variables))
            .await)
    }

    pub async fn trending(&self, media_type: &str) -> ApiResult<Vec<MediaResult>> {
        self.discover(Discovery::Trending, media_type).await
    }

    pub async fn popular(&self, media_type: &str) -> ApiResult<Vec<MediaResult>> {
        self.discover(Discovery::Popular, media_type).await
    }

    pub async fn new_releases(&self, media_type: &str) -> ApiResult<Vec<MediaResult>> {
        self.discover(Discovery::NewReleases, media_type).await
    }

    pub async fn coming_soon(&self, media_type: &str) -> ApiResult<Vec<MediaResult>> {
        self.discover(Discovery::ComingSoon, media_type).await
    }

    async fn run<F>(&self, operation: &'static str, request: F) -> Vec<MediaResult>
    where
        F: std::future::Future<Output = Result<Vec<MediaResult>, String>>,
    {
        let started = Instant::now();
        match request.await {
            Ok(results) => {
                metrics::catalog::request_success(
                    operation,
                    started.elapsed().as_secs_f64(),
                    results.len(),
                );
                results
            }
            Err(e) => {
                metrics::catalog::request_error(operation);
                warn!("AniList {} request failed: {}", operation, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingCatalog {
        seen: Mutex<Vec<Value>>,
        fail: bool,
    }

    #[async_trait]
    impl MediaCatalogPort for RecordingCatalog {
        async fn search_media(&self, variables: Value) -> Result<Vec<MediaResult>, String> {
            self.seen.lock().await.push(variables);
            if self.fail {
                return Err("upstream returned 500".to_string());
            }
            Ok(vec![MediaResult {
                id: 1,
                ..Default::default()
            }])
        }

        async fn media_by_id(&self, id: i64) -> Result<Vec<MediaResult>, String> {
            if self.fail {
                return Err("connection refused".to_string());
            }
            Ok(vec![MediaResult {
                id,
                ..Default::default()
            }])
        }
    }

    #[test]
    fn test_search_variables_include_only_provided_filters() {
        let request = SearchRequest {
            query: Some("frieren".to_string()),
            media_type: Some("Any".to_string()),
            genres: vec!["Fantasy".to_string()],
            sort_by: Some("SCORE_DESC".to_string()),
            ..Default::default()
        };
        let vars = search_variables(&request, 20);

        assert_eq!(vars["search"], "frieren");
        assert_eq!(vars["perPage"], 20);
        assert_eq!(vars["page"], 1);
        assert_eq!(vars["isAdult"], false);
        assert_eq!(vars["genres"], json!(["Fantasy"]));
        assert_eq!(vars["sortBy"], json!(["SCORE_DESC"]));
        assert_eq!(vars["genresNotIn"], json!(["Hentai"]));
        assert!(vars.get("type").is_none());
        assert!(vars.get("format").is_none());
        assert!(vars.get("statusIn").is_none());
    }

    #[test]
    fn test_search_variables_adult_and_type() {
        let request = SearchRequest {
            media_type: Some("MANGA".to_string()),
            status: vec!["FINISHED".to_string()],
            is_adult: true,
            ..Default::default()
        };
        let vars = search_variables(&request, 5);
        assert_eq!(vars["type"], "MANGA");
        assert_eq!(vars["statusIn"], json!(["FINISHED"]));
        assert!(vars.get("isAdult").is_none());
        assert!(vars.get("search").is_none());
    }

    #[test]
    fn test_search_request_deserializes_camel_case() {
        let request: SearchRequest = serde_json::from_value(json!({
            "query": "mushishi",
            "type": "ANIME",
            "isAdult": true,
            "sortBy": "POPULARITY_DESC"
        }))
        .unwrap();
        assert!(request.is_adult);
        assert_eq!(request.media_type.as_deref(), Some("ANIME"));
        assert!(request.format.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_feeds_set_sort_and_status() {
        let catalog = Arc::new(RecordingCatalog::default());
        let search = SearchUseCase::new(catalog.clone(), 10);

        search.trending("anime").await.unwrap();
        search.new_releases("MANGA").await.unwrap();
        search.coming_soon("ANIME").await.unwrap();

        let seen = catalog.seen.lock().await;
        assert_eq!(seen[0]["sortBy"], json!(["TRENDING_DESC"]));
        assert_eq!(seen[0]["type"], "ANIME");
        assert!(seen[0].get("statusIn").is_none());
        assert_eq!(seen[1]["statusIn"], json!(["RELEASING"]));
        assert_eq!(seen[1]["sortBy"], json!(["START_DATE_DESC"]));
        assert_eq!(seen[1]["type"], "MANGA");
        assert_eq!(seen[2]["statusIn"], json!(["NOT_YET_RELEASED"]));
        assert_eq!(seen[2]["sortBy"], json!(["POPULARITY_DESC"]));
    }

    #[tokio::test]
    async fn test_discovery_rejects_unknown_type() {
        let search = SearchUseCase::new(Arc::new(RecordingCatalog::default()), 10);
        let err = search.popular("novel").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_upstream_errors_become_empty_results() {
        let catalog = Arc::new(RecordingCatalog {
            fail: true,
            ..Default::default()
        });
        let search = SearchUseCase::new(catalog, 10);

        assert!(search.search(&SearchRequest::default()).await.is_empty());
        assert!(search.by_id(21).await.is_empty());
        assert!(search.trending("ANIME").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_by_id_passes_through() {
        let search = SearchUseCase::new(Arc::new(RecordingCatalog::default()), 10);
        let results = search.by_id(154587).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 154587);
    }
}
